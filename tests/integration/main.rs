//! Integration tests for the crawl engine
//!
//! Stub adapters exercise the coordinator in-process; wiremock servers
//! stand in for real job boards.

mod common;
mod facade_tests;
mod html_board_tests;
mod json_api_tests;
