pub mod activity;
pub mod activity_image;
