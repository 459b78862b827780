pub mod grid;
pub mod mapping;
pub mod plate_block;
pub mod stacked_blocks;
