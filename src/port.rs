// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Local port allocation for the debugger control channel.
//!
//! The port has to be known before port-forwarding is configured, so instead
//! of letting the OS pick one at bind time squashctl finds a free port up
//! front. The check is best-effort: another process may grab the port between
//! the check and the eventual bind.

use crate::constants::{EPHEMERAL_PORT_END, EPHEMERAL_PORT_START, LOCAL_BIND_ADDRESS};
use crate::errors::{Result, SquashError};
use std::net::TcpListener;
use tracing::debug;

/// A port found free, held bound until released.
///
/// Holding the listener keeps a second allocation from returning the same
/// port. Call [`PortReservation::release`] right before handing the port to
/// whatever binds it for real.
#[derive(Debug)]
pub struct PortReservation {
    port: u16,
    listener: TcpListener,
}

impl PortReservation {
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Unbind the port and return its number.
    #[must_use]
    pub fn release(self) -> u16 {
        drop(self.listener);
        self.port
    }
}

/// Reserve the local port for the debugger.
///
/// `0` scans the ephemeral range for an unbound port; any other value must
/// be unbound right now.
///
/// # Errors
///
/// - [`SquashError::PortInUse`] if an explicit port is already bound
/// - [`SquashError::Io`] if no port in the ephemeral range is free
pub fn allocate(requested: u16) -> Result<PortReservation> {
    if requested == 0 {
        find_any_free_port()
    } else {
        expect_port_free(requested)
    }
}

/// Reserve `port`, failing with [`SquashError::PortInUse`] if it is bound.
///
/// # Errors
///
/// Returns [`SquashError::PortInUse`] naming the port when it cannot be bound.
pub fn expect_port_free(port: u16) -> Result<PortReservation> {
    match TcpListener::bind((LOCAL_BIND_ADDRESS, port)) {
        Ok(listener) => {
            debug!(port, "Requested local port is free");
            Ok(PortReservation { port, listener })
        }
        Err(e) => {
            debug!(port, error = %e, "Requested local port is not free");
            Err(SquashError::PortInUse { port })
        }
    }
}

/// Scan the ephemeral range, starting at a random offset, for a free port.
///
/// # Errors
///
/// Returns [`SquashError::Io`] if every port in the range is bound.
pub fn find_any_free_port() -> Result<PortReservation> {
    let range_len = u32::from(EPHEMERAL_PORT_END - EPHEMERAL_PORT_START) + 1;
    let offset = scan_offset(range_len);

    for step in 0..range_len {
        let index = (offset + step) % range_len;
        let Ok(port) = u16::try_from(u32::from(EPHEMERAL_PORT_START) + index) else {
            continue;
        };
        if let Ok(listener) = TcpListener::bind((LOCAL_BIND_ADDRESS, port)) {
            debug!(port, "Found free local port");
            return Ok(PortReservation { port, listener });
        }
    }

    Err(SquashError::Io {
        context: format!(
            "finding a free local port in {EPHEMERAL_PORT_START}-{EPHEMERAL_PORT_END}"
        ),
        source: std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "no free port in the ephemeral range",
        ),
    })
}

/// Random starting index into a range of `range_len` ports.
fn scan_offset(range_len: u32) -> u32 {
    rand::random::<u32>() % range_len.max(1)
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod port_tests;
