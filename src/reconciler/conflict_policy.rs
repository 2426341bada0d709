use clap::ValueEnum;

/// What to do when a path is a directory on one side and a file on the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConflictPolicy {
    /// Remove the replica entry and materialize the source entry in its place
    #[default]
    Replace,
    /// Leave the replica entry alone and report the conflict as an error
    Skip,
}
