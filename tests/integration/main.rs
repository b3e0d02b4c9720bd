//! Integration tests for the survey pipeline
//!
//! These tests use wiremock to stand in for the surveyed websites. Each mock
//! server's `127.0.0.1:PORT` address is used as a domain, with the crawler
//! scheme set to `http`.

mod common;
mod resolver_tests;
mod survey_tests;
