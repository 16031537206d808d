// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod actions;
pub mod deletion;
pub mod directory;
pub mod ids;
pub mod menu;
pub mod model;
pub mod pagination;
pub mod selection;
pub mod sort;
pub mod state;
pub mod table;

pub use actions::*;
pub use deletion::*;
pub use directory::*;
pub use ids::*;
pub use menu::*;
pub use model::*;
pub use pagination::*;
pub use selection::*;
pub use sort::*;
pub use state::*;
pub use table::*;
