pub mod promotion;
