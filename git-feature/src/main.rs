fn main() {
    git_feature_invoke::invoke_subcommand_main(git_feature::commands::command_main)
}
