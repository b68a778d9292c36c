// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod allocation;
pub mod cli;
pub mod commission;
pub mod db;
pub mod deadline;
pub mod error;
pub mod mentions;
pub mod models;
pub mod rollup;
pub mod utils;
pub mod wallet;
pub mod commands;
