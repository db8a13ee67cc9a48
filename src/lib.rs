//! serverpack - buildpack group resolver for web server applications
//!
//! Given an application directory and its build configuration, serverpack
//! decides which buildpacks of the web servers group run and in what order:
//! the Node.js toolchain for frontends, exactly one web server (NGINX wins
//! over Apache HTTPD), and utility buildpacks switched on by configuration.
//!
//! # Core Concepts
//!
//! - **Source descriptor**: an immutable snapshot of the application's top
//!   level, parsed marker files and service bindings
//! - **Build configuration**: the recognized `BP_*`/`BPE_*` options, built
//!   explicitly from key/value pairs
//! - **Stage table**: the ordered candidates with their families, priorities
//!   and detection rules
//! - **Resolution**: a pure function from descriptor and configuration to an
//!   ordered list of stage decisions
//!
//! # Example
//!
//! ```
//! use serverpack::{BuildConfig, GroupResolver, SourceDescriptor};
//!
//! let source = SourceDescriptor::builder("/workspace")
//!     .file("package.json")
//!     .file("yarn.lock")
//!     .build();
//! let config = BuildConfig::from_vars([("BPE_SOME_VARIABLE", "some-value")]).unwrap();
//!
//! let result = GroupResolver::with_defaults().resolve(&source, &config).unwrap();
//! assert_eq!(
//!     result.log_lines(),
//!     vec![
//!         "Buildpack for Node Engine",
//!         "Buildpack for Yarn",
//!         "Buildpack for Yarn Install",
//!         "Buildpack for Node Run Script",
//!         "Buildpack for Nginx Server",
//!         "Buildpack for Environment Variables",
//!     ]
//! );
//! ```

pub mod cli;
pub mod config;
pub mod exclusion;
pub mod fs;
pub mod metadata;
pub mod resolver;
pub mod source;
pub mod stage;
pub mod util;

pub use config::{BuildConfig, ConfigError, WebServer};
pub use exclusion::{ExclusionPlan, FilterMode};
pub use metadata::StageMetadata;
pub use resolver::{Decision, GroupResolver, ResolutionEntry, ResolutionResult, ResolveError};
pub use source::SourceDescriptor;
pub use stage::{Family, StageId, StageTable};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
