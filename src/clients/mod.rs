//! Clients for services outside Slack

pub mod datahub_client;

pub use datahub_client::{DataHubGraph, EntityLookup, EntitySocialDetails};
