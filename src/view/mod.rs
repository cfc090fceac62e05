pub mod render;
pub mod state;
pub mod stock_list;
