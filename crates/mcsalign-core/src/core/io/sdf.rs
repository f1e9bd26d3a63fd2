use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Dimension, Molecule};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const RECORD_TERMINATOR: &str = "$$$$";
const PROGRAM_NAME: &str = "mcsalign";

#[derive(Debug, Error)]
pub enum SdfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error in record {record}, line {line}: {kind}")]
    Parse {
        record: usize,
        line: usize,
        kind: SdfParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum SdfParseErrorKind {
    #[error("Record is truncated before the end of its {0} block")]
    Truncated(&'static str),
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Unsupported bond type {0}")]
    UnsupportedBondType(u8),
    #[error("Bond references atom {atom} but the record has {count} atoms")]
    BondAtomOutOfRange { atom: usize, count: usize },
    #[error("V3000 records are not supported")]
    UnsupportedV3000,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

/// MDL SD file (V2000 connection tables).
pub struct SdfFile;

struct RecordParser<'a> {
    lines: &'a [String],
    record: usize,
    first_line: usize,
}

impl RecordParser<'_> {
    fn error(&self, offset: usize, kind: SdfParseErrorKind) -> SdfError {
        SdfError::Parse {
            record: self.record,
            line: self.first_line + offset,
            kind,
        }
    }

    fn line(&self, offset: usize, block: &'static str) -> Result<&str, SdfError> {
        self.lines
            .get(offset)
            .map(String::as_str)
            .ok_or_else(|| self.error(offset, SdfParseErrorKind::Truncated(block)))
    }

    fn int(&self, offset: usize, line: &str, start: usize, end: usize) -> Result<usize, SdfError> {
        let value = slice_and_trim(line, start, end);
        value.parse().map_err(|_| {
            self.error(
                offset,
                SdfParseErrorKind::InvalidInt {
                    columns: format!("{}-{}", start + 1, end),
                    value: value.into(),
                },
            )
        })
    }

    fn float(&self, offset: usize, line: &str, start: usize, end: usize) -> Result<f64, SdfError> {
        let value = slice_and_trim(line, start, end);
        value.parse().map_err(|_| {
            self.error(
                offset,
                SdfParseErrorKind::InvalidFloat {
                    columns: format!("{}-{}", start + 1, end),
                    value: value.into(),
                },
            )
        })
    }

    fn parse(&self) -> Result<Molecule, SdfError> {
        let title = self.line(0, "header")?.trim();
        let program_line = self.line(1, "header")?;
        let counts = self.line(3, "header")?;
        if counts.contains("V3000") {
            return Err(self.error(3, SdfParseErrorKind::UnsupportedV3000));
        }

        let atom_count = self.int(3, counts, 0, 3)?;
        let bond_count = self.int(3, counts, 3, 6)?;

        let mut molecule = Molecule::new(title);

        for i in 0..atom_count {
            let offset = 4 + i;
            let line = self.line(offset, "atom")?;
            let x = self.float(offset, line, 0, 10)?;
            let y = self.float(offset, line, 10, 20)?;
            let z = self.float(offset, line, 20, 30)?;
            let symbol = slice_and_trim(line, 31, 34);
            let element = Element::from_symbol(symbol).ok_or_else(|| {
                self.error(offset, SdfParseErrorKind::UnknownElement(symbol.into()))
            })?;

            let name = format!("{}{}", element.symbol(), i + 1);
            let mut atom = Atom::new(&name, element, Point3::new(x, y, z));
            atom.formal_charge = match slice_and_trim(line, 36, 39) {
                "1" => 3,
                "2" => 2,
                "3" => 1,
                "5" => -1,
                "6" => -2,
                "7" => -3,
                _ => 0,
            };
            molecule.add_atom(atom);
        }

        for i in 0..bond_count {
            let offset = 4 + atom_count + i;
            let line = self.line(offset, "bond")?;
            let a1 = self.int(offset, line, 0, 3)?;
            let a2 = self.int(offset, line, 3, 6)?;
            let code = self.int(offset, line, 6, 9)? as u8;
            let order = BondOrder::from_mdl_code(code)
                .ok_or_else(|| self.error(offset, SdfParseErrorKind::UnsupportedBondType(code)))?;
            for atom in [a1, a2] {
                if atom == 0 || atom > atom_count {
                    return Err(self.error(
                        offset,
                        SdfParseErrorKind::BondAtomOutOfRange {
                            atom,
                            count: atom_count,
                        },
                    ));
                }
            }
            molecule.add_bond(a1 - 1, a2 - 1, order);
        }

        let mut offset = 4 + atom_count + bond_count;
        let mut charges_from_block = Vec::new();
        while let Some(line) = self.lines.get(offset) {
            offset += 1;
            if line.starts_with("M  END") {
                break;
            }
            if line.starts_with("M  CHG") {
                let parts: Vec<&str> = line.split_whitespace().skip(3).collect();
                for pair in parts.chunks(2) {
                    if let [atom, charge] = pair {
                        if let (Ok(atom), Ok(charge)) =
                            (atom.parse::<usize>(), charge.parse::<i8>())
                        {
                            charges_from_block.push((atom, charge));
                        }
                    }
                }
            }
        }
        // A property block charge supersedes the atom-line charge field.
        if !charges_from_block.is_empty() {
            for atom in molecule.atoms_mut() {
                atom.formal_charge = 0;
            }
            for (atom, charge) in charges_from_block {
                if let Some(a) = atom.checked_sub(1).and_then(|i| molecule.atom_mut(i)) {
                    a.formal_charge = charge;
                }
            }
        }

        self.parse_data_items(offset, &mut molecule);

        let dimension = match slice_and_trim(program_line, 20, 22) {
            "2D" => Dimension::Two,
            "3D" => Dimension::Three,
            _ if molecule.has_nonplanar_coordinates() => Dimension::Three,
            _ => Dimension::Two,
        };
        molecule.set_dimension(dimension);

        Ok(molecule)
    }

    fn parse_data_items(&self, mut offset: usize, molecule: &mut Molecule) {
        while let Some(line) = self.lines.get(offset) {
            offset += 1;
            let Some(start) = line.find('<') else {
                continue;
            };
            if !line.starts_with('>') {
                continue;
            }
            let Some(len) = line[start + 1..].find('>') else {
                continue;
            };
            let name = &line[start + 1..start + 1 + len];

            let mut value_lines = Vec::new();
            while let Some(value_line) = self.lines.get(offset) {
                offset += 1;
                if value_line.trim().is_empty() {
                    break;
                }
                value_lines.push(value_line.as_str());
            }
            molecule.set_property(name, &value_lines.join("\n"));
        }
    }
}

impl MolecularFile for SdfFile {
    type Error = SdfError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Molecule>, Self::Error> {
        let mut molecules = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        let mut first_line = 1;

        let mut flush = |buffer: &mut Vec<String>, first_line: usize| -> Result<(), SdfError> {
            if buffer.iter().all(|l| l.trim().is_empty()) {
                buffer.clear();
                return Ok(());
            }
            let parser = RecordParser {
                lines: buffer.as_slice(),
                record: molecules.len() + 1,
                first_line,
            };
            molecules.push(parser.parse()?);
            buffer.clear();
            Ok(())
        };

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            if line.trim_end() == RECORD_TERMINATOR {
                flush(&mut buffer, first_line)?;
                first_line = line_num + 2;
            } else {
                buffer.push(line);
            }
        }
        flush(&mut buffer, first_line)?;

        if molecules.is_empty() {
            return Err(SdfError::MissingRecord("molecule connection table".into()));
        }
        Ok(molecules)
    }

    fn write_molecule(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        let dimension_code = if molecule.is_3d() { "3D" } else { "2D" };
        writeln!(writer, "{}", molecule.title())?;
        writeln!(writer, "  {:<8}{:10}{}", PROGRAM_NAME, "", dimension_code)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
            molecule.atom_count(),
            molecule.bond_count()
        )?;

        for atom in molecule.atoms() {
            let charge_code = match atom.formal_charge {
                3 => 1,
                2 => 2,
                1 => 3,
                -1 => 5,
                -2 => 6,
                -3 => 7,
                _ => 0,
            };
            writeln!(
                writer,
                "{:>10.4}{:>10.4}{:>10.4} {:<3} 0{:>3}  0  0  0  0  0  0  0  0  0  0",
                atom.position.x,
                atom.position.y,
                atom.position.z,
                atom.element.symbol(),
                charge_code
            )?;
        }
        for bond in molecule.bonds() {
            writeln!(
                writer,
                "{:>3}{:>3}{:>3}  0",
                bond.atom1 + 1,
                bond.atom2 + 1,
                bond.order.mdl_code()
            )?;
        }

        let charged: Vec<_> = molecule
            .atoms()
            .iter()
            .filter(|a| a.formal_charge != 0)
            .collect();
        for chunk in charged.chunks(8) {
            write!(writer, "M  CHG{:>3}", chunk.len())?;
            for atom in chunk {
                write!(writer, " {:>3} {:>3}", atom.index + 1, atom.formal_charge)?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "M  END")?;

        for (name, value) in molecule.properties() {
            writeln!(writer, "> <{}>", name)?;
            writeln!(writer, "{}", value)?;
            writeln!(writer)?;
        }
        writeln!(writer, "{}", RECORD_TERMINATOR)?;
        Ok(())
    }
}
