mod lane_cell;
mod map_lane;
mod model;
mod value_lane;

pub use lane_cell::LaneCell;
pub use map_lane::MapLane;
pub use model::{LaneEntry, LaneError, LaneModel};
pub use value_lane::ValueLane;
