// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |             view / edit / config
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |   state (ClientState)     |
//!              '-------------+-------------'
//!                            v
//!              ,---------------------------,
//!              |  service  StackService    |
//!              |  views + typed mutations  |
//!              '--+-----------+--------+---'
//!                 |           |        |
//!                 v           v        v
//!             binding     mutation   entity
//!            dedup views  invalidate  adapter,
//!                 |           |       selectors
//!                 +-----+-----+
//!                       v
//!                query (QueryCache)
//!          coalescing, tags, eviction, events
//!                       |
//!                       v
//!               gateway (HTTP | memory)
//!
//!   +-----------------------------------------+
//!   |  foundation   error, logging, config,   |
//!   |               model                     |
//!   +-----------------------------------------+
//! ```

pub mod binding;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod query;
pub mod service;
pub mod state;
