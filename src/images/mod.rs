mod photo;

pub use photo::{data_uri, MealPhoto, PhotoError};
