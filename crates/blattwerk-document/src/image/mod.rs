// SPDX-License-Identifier: PMPL-1.0-or-later

pub mod jfif;
pub mod processor;
