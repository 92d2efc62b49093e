mod collector_test;
mod utils;
