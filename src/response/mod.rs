// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound message parsing and result types.
//!
//! Frames arriving on the session are parsed into [`InboundMessage`]s.
//! Acknowledgments settle correlated commands with a [`CommandResult`];
//! power-state reads produce a [`PowerStateReport`].

mod ack;
mod power;

pub use ack::{ABANDONED_MESSAGE, CommandResult, CommandStatus, InboundMessage, TIMEOUT_MESSAGE};
pub use power::{ChannelState, PowerStateReport, ReportedState};
