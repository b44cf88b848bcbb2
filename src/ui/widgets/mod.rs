//! UI Widgets

pub mod detail_panel;
pub mod footer;
pub mod header;
pub mod node_table;

pub use detail_panel::DetailPanel;
pub use footer::Footer;
pub use header::Header;
pub use node_table::NodeTable;
