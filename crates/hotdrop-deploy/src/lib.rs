//! Deploy orchestration and change propagation for hotdrop.
//!
//! Keeps a running servlet container in step with a developer workspace:
//!
//! - [`DependencyDiffer`] compares an artifact's libraries with its running copy
//! - [`DeployLocationCache`] tracks where each application currently lives
//! - [`DeployOrchestrator`] undeploys (when needed) and publishes dropped
//!   artifacts, confirming each step through a [`DeploySignal`]
//! - [`ChangeRouter`] copies individual source edits into the runtime
//!
//! Successful deploys and propagations are reported through the
//! [`ReloadNotifier`] seam.
//!
//! # Example
//!
//! ```ignore
//! let locations = Arc::new(DeployLocationCache::new(staged_dir, published_dir));
//! locations.rescan();
//! let orchestrator = Arc::new(DeployOrchestrator::new(
//!     Arc::clone(&locations),
//!     DependencyDiffer::default(),
//!     Arc::new(signal),
//!     notifier,
//!     targets,
//! ));
//! orchestrator.submit(PathBuf::from("/drop/orders-1.2.0.war"))?;
//! ```

mod artifact;
mod compile;
mod diff;
mod error;
mod locations;
mod orchestrator;
mod properties;
mod reload;
mod router;
mod signal;
mod workspace;
mod xml;

pub use artifact::{Artifact, ArtifactDescriptor};
pub use compile::{CommandCompiler, StyleCompiler};
pub use diff::{DEFAULT_EXEMPT_LIBRARIES, DependencyDiffer, LibraryDiff, LibraryStatus};
pub use error::{CompileError, DeployError, RouteError, ScanError};
pub use locations::{DeployLocationCache, LocationSource, RuntimeLocation};
pub use orchestrator::{
    DeployOrchestrator, DeployOutcome, DeployState, DeployTargets, DeployTask, logical_name,
};
pub use reload::{ReloadNotifier, ReloadScope};
pub use router::{ChangeKind, ChangeRouter, RouteOutcome, RouterSettings};
pub use signal::{Awaited, DeploySignal, LogSignal, SignalAction, SignalKind};
pub use workspace::{LogicalApplication, WorkspaceIndex, scan_workspace};
