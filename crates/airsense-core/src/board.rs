//! Board definitions and serial pin dispatch
//!
//! Every supported board has a static [`BoardDef`] describing which serial
//! sensor slots it wires up and on which pins. The PMS5003T driver asks the
//! board for a [`UartConfig`] instead of hard-coding pins.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Baud rate of the PMS5003T serial interface (8N1).
pub const PMS_BAUD_RATE: u32 = 9600;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("Board [{0}] not supported")]
    UnknownBoard(u8),
    #[error("Unknown board name")]
    UnknownBoardName,
    #[error("Board [{0}] PMS5003 not supported")]
    PmsUnsupported(&'static str),
    #[error("Board [{0}] PMS5003T_2 not supported")]
    SharedUartUnsupported(&'static str),
}

/// Hardware revisions the firmware knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoardType {
    DiyBasic,
    #[serde(rename = "diy-pro-indoor-v4-2")]
    DiyProIndoorV4_2,
    #[serde(rename = "diy-pro-indoor-v3-7")]
    DiyProIndoorV3_7,
    OneIndoor,
    OpenAirOutdoor,
}

impl BoardType {
    pub const ALL: [BoardType; 5] = [
        Self::DiyBasic,
        Self::DiyProIndoorV4_2,
        Self::DiyProIndoorV3_7,
        Self::OneIndoor,
        Self::OpenAirOutdoor,
    ];

    pub const fn id(self) -> u8 {
        match self {
            Self::DiyBasic => 0,
            Self::DiyProIndoorV4_2 => 1,
            Self::DiyProIndoorV3_7 => 2,
            Self::OneIndoor => 3,
            Self::OpenAirOutdoor => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        board_def(self).name
    }
}

impl TryFrom<u8> for BoardType {
    type Error = BoardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|board| board.id() == value)
            .ok_or(BoardError::UnknownBoard(value))
    }
}

impl FromStr for BoardType {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|board| board.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(BoardError::UnknownBoardName)
    }
}

/// One serial peripheral slot on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartSlot {
    pub rx_pin: u8,
    pub tx_pin: u8,
    pub supported: bool,
}

impl UartSlot {
    const fn wired(rx_pin: u8, tx_pin: u8) -> Self {
        Self {
            rx_pin,
            tx_pin,
            supported: true,
        }
    }

    const UNWIRED: Self = Self {
        rx_pin: 0,
        tx_pin: 0,
        supported: false,
    };
}

/// Static description of a board's serial sensor wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardDef {
    pub name: &'static str,
    pub pms5003: UartSlot,
    pub senseair_s8: UartSlot,
}

/// Which hardware UART the PMS5003T is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialPort {
    /// The board's default UART, wired to the PMS5003 slot.
    Primary,
    /// A second UART borrowing the SenseAir S8 slot. Boards with two
    /// particulate sensors (outdoor monitors) run the second one here.
    Shared,
}

/// Serial parameters handed to the platform layer to open the UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    pub port: SerialPort,
    pub baud_rate: u32,
    pub rx_pin: u8,
    pub tx_pin: u8,
}

impl BoardDef {
    /// Resolve the UART parameters for a PMS5003T on `port`.
    pub const fn pms_uart(&self, port: SerialPort) -> Result<UartConfig, BoardError> {
        if !self.pms5003.supported {
            return Err(BoardError::PmsUnsupported(self.name));
        }

        let slot = match port {
            SerialPort::Primary => self.pms5003,
            SerialPort::Shared => {
                if !self.senseair_s8.supported {
                    return Err(BoardError::SharedUartUnsupported(self.name));
                }
                self.senseair_s8
            }
        };

        Ok(UartConfig {
            port,
            baud_rate: PMS_BAUD_RATE,
            rx_pin: slot.rx_pin,
            tx_pin: slot.tx_pin,
        })
    }
}

static BOARD_DEFS: [BoardDef; 5] = [
    BoardDef {
        name: "diy-basic",
        pms5003: UartSlot::wired(14, 12),
        senseair_s8: UartSlot::wired(0, 2),
    },
    BoardDef {
        name: "diy-pro-indoor-v4-2",
        pms5003: UartSlot::wired(14, 12),
        senseair_s8: UartSlot::wired(0, 2),
    },
    BoardDef {
        name: "diy-pro-indoor-v3-7",
        pms5003: UartSlot::wired(14, 12),
        senseair_s8: UartSlot::UNWIRED,
    },
    BoardDef {
        name: "one-indoor",
        pms5003: UartSlot::wired(0, 1),
        senseair_s8: UartSlot::wired(20, 21),
    },
    BoardDef {
        name: "open-air-outdoor",
        pms5003: UartSlot::wired(0, 1),
        senseair_s8: UartSlot::wired(20, 21),
    },
];

/// Look up the static definition for `board`.
pub const fn board_def(board: BoardType) -> &'static BoardDef {
    &BOARD_DEFS[board.id() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_ids_index_table() {
        for board in BoardType::ALL {
            assert_eq!(BoardType::try_from(board.id()), Ok(board));
            assert_eq!(board.name().parse::<BoardType>(), Ok(board));
        }
    }

    #[test]
    fn test_unknown_board_id() {
        assert_eq!(BoardType::try_from(42), Err(BoardError::UnknownBoard(42)));
        assert_eq!(
            "diy-pro-max".parse::<BoardType>(),
            Err(BoardError::UnknownBoardName)
        );
    }

    #[test]
    fn test_primary_port_uses_pms_slot() {
        let uart = board_def(BoardType::OneIndoor)
            .pms_uart(SerialPort::Primary)
            .unwrap();

        assert_eq!(uart.baud_rate, 9600);
        assert_eq!((uart.rx_pin, uart.tx_pin), (0, 1));
    }

    #[test]
    fn test_shared_port_borrows_senseair_slot() {
        let uart = board_def(BoardType::OpenAirOutdoor)
            .pms_uart(SerialPort::Shared)
            .unwrap();

        assert_eq!(uart.port, SerialPort::Shared);
        assert_eq!((uart.rx_pin, uart.tx_pin), (20, 21));
    }

    #[test]
    fn test_shared_port_requires_senseair_slot() {
        let def = board_def(BoardType::DiyProIndoorV3_7);

        assert!(def.pms_uart(SerialPort::Primary).is_ok());
        assert_eq!(
            def.pms_uart(SerialPort::Shared),
            Err(BoardError::SharedUartUnsupported("diy-pro-indoor-v3-7"))
        );
    }

    #[test]
    fn test_board_without_pms_slot() {
        let def = BoardDef {
            name: "bare",
            pms5003: UartSlot::UNWIRED,
            senseair_s8: UartSlot::wired(4, 5),
        };

        assert_eq!(
            def.pms_uart(SerialPort::Shared),
            Err(BoardError::PmsUnsupported("bare"))
        );
    }
}
