//! # Button Matrix Module
//!
//! Multiplexed button-matrix scanner producing the 32-bit button state.
//!
//! 32 physical switches are wired as 8 multiplexer channels × 4 row-drive
//! lines behind one 8-way analog multiplexer (3 address lines + inhibit).
//! A full scan walks every `(address, row)` pair in a strictly sequential,
//! deterministic order:
//!
//! 1. Assert inhibit while the address lines change (prevents transient
//!    crosstalk), release inhibit, wait the mux settle delay.
//! 2. Drive each row high in turn, wait the row settle delay, sample the
//!    mux common line (HIGH = button closed), drive the row low.
//! 3. The physical wiring assigns mux addresses in reverse order relative
//!    to logical numbering: `logical = (7 - address) | (row << 3)`.
//!
//! The scratch state built during the scan replaces the previous snapshot
//! only once all 32 positions have been sampled — a reader outside the scan
//! never observes a mix of old and new bits.
//!
//! ## Button identities
//!
//! | Ordinals | Group |
//! |----------|-------|
//! | 0..=5    | T1-T6 (top row) |
//! | 6..=11   | R1-R6 (right column) |
//! | 12..=17  | M/B1, B2-B6 (bottom row) |
//! | 18..=23  | L1-L6 (left column) |
//! | 24..=31  | FAV, VID, COM, A/C, TSD, WPN, FCR, Not Connected |

use std::time::Duration;

use serde::Deserialize;

use crate::config::MatrixConfig;
use crate::fault;
use crate::hal::{Level, PinBackend};
use crate::input::bounded::BoundedArray;

/// Number of logical buttons produced by one scan.
pub const BUTTON_COUNT: usize = 32;

/// Number of multiplexer address lines.
const MUX_ADDRESS_BITS: u8 = 3;

/// Number of selectable multiplexer channels.
const MUX_ADDRESS_COUNT: u8 = 1 << MUX_ADDRESS_BITS;

/// Number of row-drive lines.
const ROW_COUNT: usize = 4;

/// Canonical identity of one physical switch, ordinal 0..=31.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Button {
    Top1,
    Top2,
    Top3,
    Top4,
    Top5,
    Top6,
    Right1,
    Right2,
    Right3,
    Right4,
    Right5,
    Right6,
    Bottom1,
    Bottom2,
    Bottom3,
    Bottom4,
    Bottom5,
    Bottom6,
    Left1,
    Left2,
    Left3,
    Left4,
    Left5,
    Left6,
    Fav,
    Vid,
    Com,
    Ac,
    Tsd,
    Wpn,
    Fcr,
    NotConnected,
}

impl Button {
    /// Every button in ordinal order.
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::Top1,
        Button::Top2,
        Button::Top3,
        Button::Top4,
        Button::Top5,
        Button::Top6,
        Button::Right1,
        Button::Right2,
        Button::Right3,
        Button::Right4,
        Button::Right5,
        Button::Right6,
        Button::Bottom1,
        Button::Bottom2,
        Button::Bottom3,
        Button::Bottom4,
        Button::Bottom5,
        Button::Bottom6,
        Button::Left1,
        Button::Left2,
        Button::Left3,
        Button::Left4,
        Button::Left5,
        Button::Left6,
        Button::Fav,
        Button::Vid,
        Button::Com,
        Button::Ac,
        Button::Tsd,
        Button::Wpn,
        Button::Fcr,
        Button::NotConnected,
    ];

    /// Logical ordinal of this button.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Button for a logical ordinal, `None` outside 0..=31.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Button> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Short display name of this button.
    #[must_use]
    pub fn name(self) -> &'static str {
        button_name(self.index())
    }
}

/// Static ordinal-indexed display-name table.
static BUTTON_NAMES: BoundedArray<&str, BUTTON_COUNT> = BoundedArray::new([
    "T1",
    "T2",
    "T3",
    "T4",
    "T5",
    "T6",
    "R1",
    "R2",
    "R3",
    "R4",
    "R5",
    "R6",
    "M/B1",
    "B2",
    "B3",
    "B4",
    "B5",
    "B6",
    "L1",
    "L2",
    "L3",
    "L4",
    "L5",
    "L6",
    "FAV",
    "VID",
    "COM",
    "A/C",
    "TSD",
    "WPN",
    "FCR",
    "Not Connected",
]);

/// Short display name for a logical button ordinal.
///
/// Out-of-range ordinals yield `"INVALID"`; this lookup never fails or
/// blocks.
///
/// # Examples
///
/// ```
/// use hotas_input::input::matrix::button_name;
///
/// assert_eq!(button_name(0), "T1");
/// assert_eq!(button_name(24), "FAV");
/// assert_eq!(button_name(31), "Not Connected");
/// assert_eq!(button_name(32), "INVALID");
/// ```
#[must_use]
pub fn button_name(index: u8) -> &'static str {
    let index = usize::from(index);
    if index < BUTTON_NAMES.size() {
        BUTTON_NAMES[index]
    } else {
        "INVALID"
    }
}

/// Logical button index for a `(mux address, row)` pair.
///
/// The physical wiring assigns mux addresses in reverse order relative to
/// logical numbering.
///
/// # Examples
///
/// ```
/// use hotas_input::input::matrix::logical_index;
///
/// assert_eq!(logical_index(3, 2), 20); // 4 | 16
/// assert_eq!(logical_index(7, 0), 0);  // T1
/// assert_eq!(logical_index(0, 3), 31); // Not Connected
/// ```
#[must_use]
pub const fn logical_index(address: u8, row: u8) -> u8 {
    (MUX_ADDRESS_COUNT - 1 - address) | (row << MUX_ADDRESS_BITS)
}

/// Observed state of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Open,
    Closed,
}

/// Snapshot packing strategy, selected at configuration time.
///
/// Both variants present the same 32-bit mask surface; `Boolean` keeps the
/// samples in a bounds-checked array instead of a packed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatePacking {
    Packed,
    Boolean,
}

/// Complete button snapshot in the configured packing.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MatrixState {
    Packed(u32),
    Boolean(BoundedArray<bool, BUTTON_COUNT>),
}

impl MatrixState {
    fn blank(packing: StatePacking) -> Self {
        match packing {
            StatePacking::Packed => MatrixState::Packed(0),
            StatePacking::Boolean => MatrixState::Boolean(BoundedArray::default()),
        }
    }

    fn set(&mut self, index: u8, closed: bool) {
        match self {
            MatrixState::Packed(mask) => {
                if closed {
                    *mask |= 1 << index;
                } else {
                    *mask &= !(1 << index);
                }
            }
            MatrixState::Boolean(states) => states[usize::from(index)] = closed,
        }
    }

    fn mask(&self) -> u32 {
        match self {
            MatrixState::Packed(mask) => *mask,
            MatrixState::Boolean(states) => states
                .iter()
                .enumerate()
                .fold(0, |mask, (i, &closed)| {
                    if closed {
                        mask | (1 << i)
                    } else {
                        mask
                    }
                }),
        }
    }
}

/// Digital pin assignment for the matrix, fixed at construction.
#[derive(Debug, Clone)]
pub struct MatrixPins {
    /// Goes to the mux inhibit (NOT-ENABLE) input.
    pub mux_inhibit: u8,
    /// Goes to the mux common input/output.
    pub mux_common: u8,
    /// Go to the mux A/B/C address inputs, least significant first.
    pub mux_address: BoundedArray<u8, 3>,
    /// Drive the four matrix rows.
    pub rows: BoundedArray<u8, ROW_COUNT>,
}

/// Convert a validated pin list into its fixed-topology table.
///
/// Configuration validation guarantees the length; a mismatch reaching this
/// point is a programming defect and enters fail-stop.
pub(crate) fn pin_table<const N: usize>(pins: &[u8], role: &str) -> BoundedArray<u8, N> {
    match <[u8; N]>::try_from(pins) {
        Ok(table) => BoundedArray::new(table),
        Err(_) => fault::fail(&format!(
            "{role} pin table must have exactly {N} entries. Actual: {}",
            pins.len()
        )),
    }
}

/// The multiplexed button-matrix scanner.
///
/// Exclusive owner of the mux control pins and the row-drive pins. `read`
/// runs one full scan; the accessors serve the most recently committed
/// snapshot.
#[derive(Debug, Clone)]
pub struct ButtonMatrix {
    pins: MatrixPins,
    mux_settle: Duration,
    row_settle: Duration,
    state: MatrixState,
    packing: StatePacking,
}

impl ButtonMatrix {
    /// Create a scanner over the given pin assignment.
    #[must_use]
    pub fn new(
        pins: MatrixPins,
        mux_settle: Duration,
        row_settle: Duration,
        packing: StatePacking,
    ) -> Self {
        Self {
            pins,
            mux_settle,
            row_settle,
            state: MatrixState::blank(packing),
            packing,
        }
    }

    /// Create a scanner from the validated matrix configuration.
    #[must_use]
    pub fn from_config(config: &MatrixConfig) -> Self {
        let pins = MatrixPins {
            mux_inhibit: config.mux_inhibit,
            mux_common: config.mux_common,
            mux_address: pin_table(&config.mux_address_pins, "Multiplexer address"),
            rows: pin_table(&config.row_pins, "Row drive"),
        };
        Self::new(
            pins,
            Duration::from_micros(config.mux_settle_us),
            Duration::from_micros(config.row_settle_us),
            config.state_packing,
        )
    }

    /// Select a mux channel, holding inhibit high while the address lines
    /// change, then wait out the settle delay.
    fn select_mux_address<B: PinBackend>(&self, backend: &mut B, address: u8) {
        backend.write(self.pins.mux_inhibit, Level::High);

        for (bit, &pin) in self.pins.mux_address.iter().enumerate() {
            let level = Level::from_bool(address & (1 << bit) != 0);
            backend.write(pin, level);
        }

        backend.write(self.pins.mux_inhibit, Level::Low);
        backend.delay(self.mux_settle);
    }

    /// Run one full scan of all 32 positions and commit the new snapshot.
    ///
    /// The scan always runs to completion; the previous snapshot stays
    /// visible until the replacement is complete.
    pub fn read<B: PinBackend>(&mut self, backend: &mut B) {
        let mut next = MatrixState::blank(self.packing);

        for address in 0..MUX_ADDRESS_COUNT {
            self.select_mux_address(backend, address);

            for (row, &row_pin) in self.pins.rows.iter().enumerate() {
                // Drive the row high and check whether the signal arrives at
                // the mux common line.
                backend.write(row_pin, Level::High);
                backend.delay(self.row_settle);
                let closed = backend.read(self.pins.mux_common).is_high();
                backend.write(row_pin, Level::Low);

                next.set(logical_index(address, row as u8), closed);
            }
        }

        self.state = next;
    }

    /// Full 32-bit button mask, bit i = logical button i.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.state.mask()
    }

    /// State of one logical button in the current snapshot.
    #[must_use]
    pub fn get_button(&self, button: Button) -> ButtonState {
        if self.get() & (1 << button.index()) != 0 {
            ButtonState::Closed
        } else {
            ButtonState::Open
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimBackend;

    fn matrix_with(packing: StatePacking) -> (ButtonMatrix, SimBackend) {
        let mut config = MatrixConfig::default();
        config.state_packing = packing;
        let matrix = ButtonMatrix::from_config(&config);
        let backend = SimBackend::new(&config);
        (matrix, backend)
    }

    // ==================== Logical Index Tests ====================

    /// Golden table from the physical wiring: entry [row][address] is the
    /// logical button index.
    const GOLDEN_INDEX_TABLE: [[u8; 8]; 4] = [
        [7, 6, 5, 4, 3, 2, 1, 0],
        [15, 14, 13, 12, 11, 10, 9, 8],
        [23, 22, 21, 20, 19, 18, 17, 16],
        [31, 30, 29, 28, 27, 26, 25, 24],
    ];

    #[test]
    fn test_logical_index_matches_golden_table() {
        for row in 0..4u8 {
            for address in 0..8u8 {
                assert_eq!(
                    logical_index(address, row),
                    GOLDEN_INDEX_TABLE[row as usize][address as usize],
                    "address={address}, row={row}"
                );
            }
        }
    }

    #[test]
    fn test_logical_index_is_a_bijection() {
        let mut seen = [false; BUTTON_COUNT];
        for address in 0..8u8 {
            for row in 0..4u8 {
                let index = usize::from(logical_index(address, row));
                assert!(!seen[index], "duplicate logical index {index}");
                seen[index] = true;
            }
        }
        assert!(seen.iter().all(|&v| v));
    }

    // ==================== Name Table Tests ====================

    #[test]
    fn test_button_names() {
        assert_eq!(button_name(0), "T1");
        assert_eq!(button_name(7), "R2");
        assert_eq!(button_name(12), "M/B1");
        assert_eq!(button_name(23), "L6");
        assert_eq!(button_name(27), "A/C");
        assert_eq!(button_name(30), "FCR");
        assert_eq!(button_name(31), "Not Connected");
    }

    #[test]
    fn test_button_name_out_of_range_is_invalid() {
        assert_eq!(button_name(32), "INVALID");
        assert_eq!(button_name(u8::MAX), "INVALID");
    }

    #[test]
    fn test_button_enum_round_trips_ordinals() {
        for index in 0..BUTTON_COUNT as u8 {
            let button = Button::from_index(index).unwrap();
            assert_eq!(button.index(), index);
            assert_eq!(button.name(), button_name(index));
        }
        assert_eq!(Button::from_index(32), None);
    }

    // ==================== Scan Round-Trip Tests ====================

    fn assert_round_trip(packing: StatePacking, pattern: u32) {
        let (mut matrix, mut backend) = matrix_with(packing);
        backend.set_pattern(pattern);

        matrix.read(&mut backend);

        assert_eq!(matrix.get(), pattern, "packing={packing:?}");
        for index in 0..BUTTON_COUNT as u8 {
            let button = Button::from_index(index).unwrap();
            let expected = if pattern & (1 << index) != 0 {
                ButtonState::Closed
            } else {
                ButtonState::Open
            };
            assert_eq!(matrix.get_button(button), expected, "button {index}");
        }
    }

    #[test]
    fn test_round_trip_packed() {
        for pattern in [0, u32::MAX, 0xA5C3_0F71, 1 << 31, 1] {
            assert_round_trip(StatePacking::Packed, pattern);
        }
    }

    #[test]
    fn test_round_trip_boolean() {
        for pattern in [0, u32::MAX, 0xA5C3_0F71, 1 << 31, 1] {
            assert_round_trip(StatePacking::Boolean, pattern);
        }
    }

    #[test]
    fn test_rescan_replaces_whole_snapshot() {
        let (mut matrix, mut backend) = matrix_with(StatePacking::Packed);

        backend.set_pattern(0xFFFF_0000);
        matrix.read(&mut backend);
        assert_eq!(matrix.get(), 0xFFFF_0000);

        backend.set_pattern(0x0000_00FF);
        matrix.read(&mut backend);
        // No stale bits from the previous snapshot survive.
        assert_eq!(matrix.get(), 0x0000_00FF);
    }

    #[test]
    fn test_state_before_first_scan_is_all_open() {
        let (matrix, _backend) = matrix_with(StatePacking::Boolean);
        assert_eq!(matrix.get(), 0);
        assert_eq!(matrix.get_button(Button::Fav), ButtonState::Open);
    }

    // ==================== Protocol Order Tests ====================

    #[test]
    fn test_scan_protocol_write_order() {
        let config = MatrixConfig::default();
        let (mut matrix, mut backend) = matrix_with(StatePacking::Packed);

        matrix.read(&mut backend);

        // Per address: inhibit high, 3 address lines, inhibit low, then
        // 4 × (row high, row low).
        let per_address = 1 + 3 + 1 + ROW_COUNT * 2;
        assert_eq!(backend.writes().len(), per_address * 8);

        let first = &backend.writes()[..per_address];
        assert_eq!(first[0], (config.mux_inhibit, Level::High));
        assert_eq!(first[1].0, config.mux_address_pins[0]);
        assert_eq!(first[2].0, config.mux_address_pins[1]);
        assert_eq!(first[3].0, config.mux_address_pins[2]);
        assert_eq!(first[4], (config.mux_inhibit, Level::Low));
        assert_eq!(first[5], (config.row_pins[0], Level::High));
        assert_eq!(first[6], (config.row_pins[0], Level::Low));
        assert_eq!(first[7], (config.row_pins[1], Level::High));
    }

    #[test]
    fn test_scan_settle_delays() {
        let (mut matrix, mut backend) = matrix_with(StatePacking::Packed);

        matrix.read(&mut backend);

        // One mux settle per address plus one row settle per sample.
        assert_eq!(backend.delays().len(), 8 + BUTTON_COUNT);
    }

    #[test]
    fn test_address_lines_encode_address_bits() {
        let (matrix, mut backend) = matrix_with(StatePacking::Packed);

        matrix.select_mux_address(&mut backend, 0b101);

        let writes = backend.writes();
        // Bit 0 → first address pin, bit 2 → third address pin.
        assert_eq!(writes[1].1, Level::High);
        assert_eq!(writes[2].1, Level::Low);
        assert_eq!(writes[3].1, Level::High);
    }
}
