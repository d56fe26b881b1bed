pub mod callbacks;
pub mod coordinator;
pub mod face_blur;

#[cfg(test)]
mod scenarios;
