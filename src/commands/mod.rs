// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod config;
pub mod users;
pub mod orgs;
pub mod projects;
pub mod expenses;
pub mod columns;
pub mod tasks;
pub mod commissions;
pub mod wallets;
pub mod notifications;
pub mod reports;
pub mod exporter;
pub mod migrate;
pub mod doctor;
