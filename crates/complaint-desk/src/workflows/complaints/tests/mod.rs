mod common;
mod desk;
mod review;
