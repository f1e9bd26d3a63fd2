use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Dimension, Molecule};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;

const BIOGRAF_VERSION: &str = "BIOGRF 200";
const ATOM_FORMAT: &str =
    "FORMAT ATOM   (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a5,i3,i2,1x,f8.5)";
const LIGAND_RESIDUE_NAME: &str = "LIG";

#[derive(Debug, Error)]
pub enum BgfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: BgfParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum BgfParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 80 chars)")]
    LineTooShort,
    #[error("Cannot determine element from force field type '{0}'")]
    UnknownElement(String),
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

/// Derives the element from a DREIDING-style type (`C_3`, `N_R`, `Cl`), falling
/// back to the leading letters of the atom name.
fn element_from_type(ff_type: &str, atom_name: &str) -> Option<Element> {
    let from_label = |label: &str| {
        let letters: String = label.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        Element::from_symbol(&letters)
            .or_else(|| letters.get(..1).and_then(Element::from_symbol))
    };
    from_label(ff_type.split('_').next().unwrap_or(""))
        .or_else(|| from_label(atom_name))
}

/// BIOGRAF (BGF) structure file holding one or more ligand blocks.
pub struct BgfFile;

#[derive(Default)]
struct BlockBuilder {
    molecule: Molecule,
    serial_to_index: HashMap<usize, usize>,
    conect: Vec<(usize, Vec<usize>)>,
    orders: HashMap<usize, Vec<BondOrder>>,
}

impl BlockBuilder {
    fn finish(mut self) -> Result<Molecule, BgfError> {
        for (serial, partners) in &self.conect {
            let orders = self.orders.get(serial);
            let &a1 = self.serial_to_index.get(serial).ok_or_else(|| {
                BgfError::Inconsistency(format!("CONECT references unknown atom serial {}", serial))
            })?;
            for (k, partner) in partners.iter().enumerate() {
                let &a2 = self.serial_to_index.get(partner).ok_or_else(|| {
                    BgfError::Inconsistency(format!(
                        "CONECT references unknown atom serial {}",
                        partner
                    ))
                })?;
                let order = orders
                    .and_then(|o| o.get(k))
                    .copied()
                    .unwrap_or_default();
                // The first record that mentions a bond defines its order.
                self.molecule.add_bond(a1, a2, order);
            }
        }
        self.molecule.set_dimension(Dimension::Three);
        Ok(self.molecule)
    }
}

impl MolecularFile for BgfFile {
    type Error = BgfError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Molecule>, Self::Error> {
        let mut molecules = Vec::new();
        let mut block = BlockBuilder::default();
        let mut block_has_atoms = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            let record_type = slice_and_trim(&line, 0, 6);
            match record_type {
                "DESCRP" => block.molecule.set_title(line.get(6..).unwrap_or("").trim()),
                "ATOM" | "HETATM" => {
                    if line.len() < 80 {
                        return Err(BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::LineTooShort,
                        });
                    }

                    let serial_str = slice_and_trim(&line, 7, 12);
                    let name_str = slice_and_trim(&line, 13, 18);
                    let x_str = slice_and_trim(&line, 30, 40);
                    let y_str = slice_and_trim(&line, 40, 50);
                    let z_str = slice_and_trim(&line, 50, 60);
                    let ff_type_str = slice_and_trim(&line, 61, 66);
                    let charge_str = slice_and_trim(&line, 72, 80);

                    if name_str.is_empty() {
                        return Err(BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::MissingRequiredField {
                                columns: "14-18".into(),
                            },
                        });
                    }
                    let serial: usize = serial_str.parse().map_err(|_| BgfError::Parse {
                        line: line_num,
                        kind: BgfParseErrorKind::InvalidInt {
                            columns: "8-12".into(),
                            value: serial_str.into(),
                        },
                    })?;
                    if block.serial_to_index.contains_key(&serial) {
                        return Err(BgfError::Inconsistency(format!(
                            "Duplicate atom serial: {}",
                            serial
                        )));
                    }

                    let parse_float = |value: &str, columns: &str| -> Result<f64, BgfError> {
                        value.parse().map_err(|_| BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::InvalidFloat {
                                columns: columns.into(),
                                value: value.into(),
                            },
                        })
                    };
                    let x = parse_float(x_str, "31-40")?;
                    let y = parse_float(y_str, "41-50")?;
                    let z = parse_float(z_str, "51-60")?;
                    let charge = parse_float(charge_str, "73-80")?;

                    let element = element_from_type(ff_type_str, name_str).ok_or_else(|| {
                        BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::UnknownElement(ff_type_str.into()),
                        }
                    })?;

                    let mut atom = Atom::new(name_str, element, Point3::new(x, y, z));
                    atom.force_field_type = ff_type_str.to_string();
                    atom.partial_charge = charge;
                    let index = block.molecule.add_atom(atom);
                    block.serial_to_index.insert(serial, index);
                    block_has_atoms = true;
                }
                "CONECT" | "ORDER" => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() < 3 {
                        continue;
                    }
                    let Ok(serial) = parts[1].parse::<usize>() else {
                        continue;
                    };
                    if record_type == "CONECT" {
                        let partners = parts[2..]
                            .iter()
                            .filter_map(|p| p.parse::<usize>().ok())
                            .collect();
                        block.conect.push((serial, partners));
                    } else {
                        let orders = parts[2..]
                            .iter()
                            .map(|p| p.parse().unwrap_or_default())
                            .collect();
                        block.orders.insert(serial, orders);
                    }
                }
                "END" => {
                    if block_has_atoms {
                        molecules.push(std::mem::take(&mut block).finish()?);
                    } else {
                        block = BlockBuilder::default();
                    }
                    block_has_atoms = false;
                }
                _ => {}
            }
        }
        if block_has_atoms {
            molecules.push(block.finish()?);
        }

        if molecules.is_empty() {
            return Err(BgfError::MissingRecord("ATOM/HETATM records".into()));
        }
        Ok(molecules)
    }

    fn write_molecule(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", BIOGRAF_VERSION)?;
        writeln!(writer, "DESCRP {}", molecule.title())?;
        writeln!(writer, "REMARK Generated by mcsalign")?;
        writeln!(writer, "FORCEFIELD DREIDING")?;
        writeln!(writer, "{}", ATOM_FORMAT)?;

        for atom in molecule.atoms() {
            let ff_type = if atom.force_field_type.is_empty() {
                atom.element.symbol()
            } else {
                atom.force_field_type.as_str()
            };
            writeln!(
                writer,
                "{:<6} {:>5} {:<5.5} {:>3} {:1} {:>5}{:>10.5}{:>10.5}{:>10.5} {:<5.5}{:>3}{:>2} {:>8.5}",
                "HETATM",
                atom.index + 1,
                atom.name,
                LIGAND_RESIDUE_NAME,
                'A',
                1,
                atom.position.x,
                atom.position.y,
                atom.position.z,
                ff_type,
                molecule.neighbors(atom.index).len(),
                0,
                atom.partial_charge
            )?;
        }

        writeln!(writer, "FORMAT CONECT (a6,12i6)")?;
        let mut bond_map: BTreeMap<usize, Vec<(usize, BondOrder)>> = BTreeMap::new();
        for bond in molecule.bonds() {
            bond_map
                .entry(bond.atom1 + 1)
                .or_default()
                .push((bond.atom2 + 1, bond.order));
            bond_map
                .entry(bond.atom2 + 1)
                .or_default()
                .push((bond.atom1 + 1, bond.order));
        }
        for (serial, conns) in &bond_map {
            write!(writer, "CONECT{:>6}", serial)?;
            for (partner, _) in conns {
                write!(writer, "{:>6}", partner)?;
            }
            writeln!(writer)?;
            if conns.iter().any(|(_, o)| *o != BondOrder::Single) {
                write!(writer, "ORDER {:>6}", serial)?;
                for (_, order) in conns {
                    write!(writer, "{:>6}", order.mdl_code())?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }
}
