mod activity_image_repo;
mod activity_repo;

pub use activity_image_repo::ActivityImageRepo;
pub use activity_repo::ActivityRepo;
