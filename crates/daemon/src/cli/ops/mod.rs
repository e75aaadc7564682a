pub mod events;
pub mod init;
pub mod version;
pub mod watch;

pub use events::Events;
pub use init::Init;
pub use version::Version;
pub use watch::Watch;
