// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod columns;
pub mod events;
pub mod ids;
pub mod model;
pub mod navigation;
pub mod search;
pub mod selection;
pub mod store;
pub mod summary;
pub mod timing;
pub mod viewport;

pub use columns::*;
pub use events::*;
pub use ids::*;
pub use model::*;
pub use navigation::*;
pub use search::*;
pub use selection::*;
pub use store::*;
pub use summary::*;
pub use timing::*;
pub use viewport::*;
