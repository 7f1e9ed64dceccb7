pub mod normalize;
pub mod slots;
pub mod srcei;
