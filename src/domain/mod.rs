pub mod distraction;
pub mod entity;
pub mod geom;
pub mod guard;
pub mod map;
pub mod pathfinding;
pub mod perception;
pub mod tile;
