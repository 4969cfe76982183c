//! The symbolic packet buffers of an execution state.
//!
//! The first bit of a packet is its most significant bit, so appending data
//! to a buffer concatenates it below the existing contents.

use crate::{
    constant::PACKET_VARIABLE_PREFIX,
    expr::{fold, ExprRef, Sort, Variable},
};

/// The input, working and output packets of a path, along with the parse
/// cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct PacketBuffers {
    /// Everything the test has to feed into the program.
    input: ExprRef,

    /// The part of the packet that has not been extracted yet.
    working: ExprRef,

    /// Everything the program has emitted.
    output: ExprRef,

    /// The number of bits extracted so far.
    cursor: usize,

    /// The number of packet variables allocated so far, used to name the next
    /// one.
    allocated: usize,
}

impl PacketBuffers {
    /// Creates empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input:     fold::empty(),
            working:   fold::empty(),
            output:    fold::empty(),
            cursor:    0,
            allocated: 0,
        }
    }

    /// Gets the input packet.
    #[must_use]
    pub fn input(&self) -> &ExprRef {
        &self.input
    }

    /// Gets the part of the packet that has not been extracted yet.
    #[must_use]
    pub fn working(&self) -> &ExprRef {
        &self.working
    }

    /// Gets the output packet.
    #[must_use]
    pub fn output(&self) -> &ExprRef {
        &self.output
    }

    /// Gets the number of bits extracted so far.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Gets the number of packet variables allocated so far.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Extracts the next `width` bits of the packet.
    ///
    /// When the working packet is shorter than `width`, a fresh variable for
    /// the missing bits is appended to both the input and the working packet
    /// and returned alongside the extracted value, so that the caller can
    /// register it for model completion.
    pub fn extract(&mut self, width: usize) -> (ExprRef, Option<Variable>) {
        let available = self.working.sort().width();
        let fresh = (available < width).then(|| {
            let variable = Variable::new(
                format!("{PACKET_VARIABLE_PREFIX}_{}", self.allocated),
                Sort::Bits(width - available),
            );
            self.allocated += 1;
            let value = fold::variable(variable.clone());
            self.input = fold::concat(self.input.clone(), value.clone());
            self.working = fold::concat(self.working.clone(), value);
            variable
        });

        let total = self.working.sort().width();
        let extracted = if width == 0 {
            fold::empty()
        } else {
            fold::slice(self.working.clone(), total - 1, total - width)
        };
        self.working = if total == width {
            fold::empty()
        } else {
            fold::slice(self.working.clone(), total - width - 1, 0)
        };
        self.cursor += width;

        (extracted, fresh)
    }

    /// Appends `value` to the output packet.
    pub fn emit(&mut self, value: ExprRef) {
        self.output = fold::concat(self.output.clone(), value);
    }
}

impl Default for PacketBuffers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        expr::{fold, Sort, Variable},
        state::packet::PacketBuffers,
    };

    #[test]
    fn allocates_variables_for_missing_bits() {
        let mut buffers = PacketBuffers::new();

        let (value, fresh) = buffers.extract(16);
        let variable = Variable::new("pkt_var_0", Sort::Bits(16));
        assert_eq!(fresh, Some(variable.clone()));
        assert_eq!(value, fold::variable(variable.clone()));
        assert_eq!(buffers.input(), &fold::variable(variable));
        assert_eq!(buffers.working().sort(), Sort::Bits(0));
        assert_eq!(buffers.cursor(), 16);
    }

    #[test]
    fn extracts_from_the_front_of_the_packet() {
        let mut buffers = PacketBuffers::new();
        buffers.extract(16);
        let first = Variable::new("pkt_var_0", Sort::Bits(16));

        let (_, fresh) = buffers.extract(8);
        let second = Variable::new("pkt_var_1", Sort::Bits(8));
        assert_eq!(fresh, Some(second.clone()));
        assert_eq!(buffers.allocated(), 2);
        assert_eq!(
            buffers.input(),
            &fold::concat(fold::variable(first), fold::variable(second))
        );
    }

    #[test]
    fn emits_in_order() {
        let mut buffers = PacketBuffers::new();
        buffers.emit(fold::bits(0xab, 8));
        buffers.emit(fold::bits(0xcd, 8));

        assert_eq!(buffers.output(), &fold::bits(0xabcd, 16));
    }
}
