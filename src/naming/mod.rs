/*!
 * Naming Module
 * Handles, namespaces, registry backends and the resolver chain
 */

pub mod directory;
pub mod discovery;
pub mod handle;
pub mod local;
pub mod namespace;
pub mod resolver;
pub mod traits;
pub mod types;

pub use directory::{DirectoryClient, RemoteDirectory};
pub use discovery::{Announcement, DiscoveryBrowser, DiscoveryRegistry};
pub use handle::{Handle, HandleMap};
pub use local::{LocalRegistry, LocalTarget};
pub use resolver::Resolver;
pub use traits::Registry;
pub use types::{RegistryError, RegistryResult};
