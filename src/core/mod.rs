// Per-entity grid configuration

pub mod traits;

// Re-export commonly used items
pub use traits::DataGrid;
