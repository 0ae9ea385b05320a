//! Integration tests for the driftwatch monitoring pipeline

mod support;

mod cli_contracts;
mod cycle;
