mod award;
mod common;
mod comparison;
