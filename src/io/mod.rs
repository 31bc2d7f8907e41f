// Process-level I/O: instance locking and OS signals
pub mod lock;
pub mod signals;
