// PDF report generation: payload assembly plus an in-memory Typst world
// compiled per request. No filesystem access at render time.

pub mod fonts;
pub mod payload;
pub mod render;
pub mod world;
