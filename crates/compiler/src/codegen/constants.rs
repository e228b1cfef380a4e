//! Byte-constant emission
//!
//! Producing an arbitrary byte with bare `+` runs costs up to 255
//! commands. The compiler ships a precomputed generator for every value
//! 0-255: small values (and values close to 256, which wrap) stay direct
//! runs, everything else is a multiplicative loop construction. Generators
//! run in the scratch span, which gets zeroed first; the value is then
//! move-transferred into its destination.
//!
//! The table lives in `constants.toml`, embedded in the binary and parsed
//! once on first use.

use std::sync::OnceLock;

use serde::Deserialize;

use super::CodeGen;

static TABLE_TOML: &str = include_str!("constants.toml");

/// One table entry: the snippet and how many cells past its start it
/// touches (the whole span must be zero before it runs).
#[derive(Debug, Clone, Deserialize)]
pub struct Generator {
    pub value: u8,
    pub snippet: String,
    pub cells: u8,
}

#[derive(Debug, Deserialize)]
struct GeneratorFile {
    constant: Vec<Generator>,
}

/// The table, indexed by value.
pub fn generator_for(value: u8) -> &'static Generator {
    static TABLE: OnceLock<Vec<Generator>> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let parsed: GeneratorFile =
            toml::from_str(TABLE_TOML).expect("embedded constant table is valid TOML");
        assert_eq!(
            parsed.constant.len(),
            256,
            "constant table must cover every byte value"
        );
        parsed.constant
    });
    &table[value as usize]
}

/// Shortest signed run equivalent to `value` on a zeroed, wrapping cell.
fn signed_run(value: u8) -> i64 {
    if value <= 128 {
        value as i64
    } else {
        value as i64 - 256
    }
}

/// Emitted-length estimate for the generator route: zero the span, run the
/// snippet, loop the value over to the target.
fn generator_cost(generator: &Generator) -> i64 {
    let span = generator.cells as i64 + 1;
    generator.snippet.len() as i64 + 4 * span + 8
}

impl CodeGen<'_> {
    /// Zero the generator's span, run it, and return the cell holding the
    /// value. Generator loop bodies are head-neutral, so tracked emission
    /// knows where the snippet halts.
    fn run_generator(&mut self, value: u8) -> usize {
        let generator = generator_for(value);
        let scratch = self.layout.scratch;
        for offset in 0..=generator.cells as usize {
            self.out.move_to(scratch + offset);
            self.out.raw("[-]");
        }
        self.out.move_to(scratch);
        self.out.tracked(&generator.snippet);
        self.out.head()
    }

    /// Destructive move of `src` into `dst`, one `op` per count.
    fn transfer(&mut self, src: usize, dst: usize, op: char) {
        self.out.move_to(src);
        self.out.raw("[");
        self.out.move_to(dst);
        self.out.raw_char(op);
        self.out.move_to(src);
        self.out.raw("-]");
    }

    /// Set `cell` to a constant: zero it, then the cheaper of a direct run
    /// or a staged generator.
    pub(super) fn set_constant(&mut self, cell: usize, value: u8) {
        let run = signed_run(value);
        let generator = generator_for(value);

        if value <= 15 || 3 + run.abs() <= generator_cost(generator) {
            self.out.move_to(cell);
            self.out.raw("[-]");
            self.out.add(run);
        } else {
            self.out.move_to(cell);
            self.out.raw("[-]");
            let src = self.run_generator(value);
            self.transfer(src, cell, '+');
        }
    }

    /// Add (or subtract) a folded literal to `cell` without clearing it.
    pub(super) fn add_constant(&mut self, cell: usize, amount: i64, subtract: bool) {
        let wrapped = amount.rem_euclid(256) as u8;
        // Net addition this statement performs, mod 256.
        let net = if subtract {
            (256 - wrapped as i64) % 256
        } else {
            wrapped as i64
        };
        let run = if net <= 128 { net } else { net - 256 };

        if run.abs() <= 15 {
            self.out.move_to(cell);
            self.out.add(run);
            return;
        }

        // Either add `net` or subtract `256 - net`, whichever generator is
        // cheaper; a direct run may still beat both.
        let plus = generator_for(net as u8);
        let minus = generator_for((256 - net) as u8);
        let (generator_value, op) = if generator_cost(plus) <= generator_cost(minus) {
            (net as u8, '+')
        } else {
            ((256 - net) as u8, '-')
        };

        if run.abs() <= generator_cost(generator_for(generator_value)) {
            self.out.move_to(cell);
            self.out.add(run);
        } else {
            let src = self.run_generator(generator_value);
            self.transfer(src, cell, op);
        }
    }

    /// Materialise a constant somewhere in the scratch span (for `print`),
    /// returning the cell it landed in.
    pub(super) fn materialize_constant(&mut self, value: u8) -> usize {
        let run = signed_run(value);
        let generator = generator_for(value);

        if value <= 15 || 3 + run.abs() <= generator_cost(generator) {
            let cell = self.layout.scratch;
            self.out.move_to(cell);
            self.out.raw("[-]");
            self.out.add(run);
            cell
        } else {
            self.run_generator(value)
        }
    }
}
