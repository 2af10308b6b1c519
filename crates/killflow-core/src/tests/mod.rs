#![allow(unused_imports)]
#![allow(unused_variables)]

mod builder_tests;
mod loop_tests;
