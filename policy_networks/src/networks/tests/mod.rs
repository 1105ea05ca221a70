//! Behavioural tests for the policy networks.
//!
//! # Test Organization
//!
//! - `actor_distribution_tests`: construction rules, nest handling and
//!   batch-shape propagation of the actor network
//! - `projection_tests`: initial distributions produced by the default heads
