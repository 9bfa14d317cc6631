use crate::asset::ArtifactCategory;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "modwire",
    about = "Register generated artifacts in their nearest module declaration",
    version,
    author
)]
pub struct Cli {
    /// Path to the project directory (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import an artifact into its nearest module and add it to a registration list
    Register {
        /// Path of the generated artifact, relative to --path (e.g. src/asset/asset.service.ts)
        #[arg(value_name = "ARTIFACT")]
        artifact: String,

        /// Exported class name of the artifact
        #[arg(value_name = "CLASS_NAME")]
        class_name: String,

        /// Registration list the class joins
        #[arg(short, long, value_enum, default_value_t = ArtifactCategory::Component)]
        kind: ArtifactCategory,

        /// Print the update report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which module file an artifact would be registered in
    Locate {
        /// Path of the artifact to start searching from
        #[arg(value_name = "ARTIFACT")]
        artifact: String,
    },

    /// List artifact kinds and the registration keys they map to
    Kinds,
}
