pub mod canvas;
pub mod charset;
pub mod color;
pub mod config;
pub mod diagram;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod pathfind;
pub mod port;
pub mod render;
pub mod renderer;
pub mod route;
pub mod width;
