#![warn(clippy::all)]
#![doc = include_str!("../README.md")]

// Modules that make up the Bucket View library.
mod args;
mod bridge;
mod clipboard;
mod engine;
mod error;
mod file_dialog;
mod file_extension;
mod html;
mod layout;
mod object_path;
mod path_reader;
mod path_tree;
mod query;
mod render;
mod session;
mod table;
mod traits;

// Publicly expose the contents of these modules.
pub use self::{
    args::{Arguments, TOKEN_ENV},
    bridge::*,
    clipboard::*,
    engine::*,
    error::*,
    file_dialog::*,
    file_extension::*,
    html::*,
    layout::*,
    object_path::*,
    path_reader::*,
    path_tree::*,
    query::*,
    render::*,
    session::*,
    table::*,
    traits::*,
};

