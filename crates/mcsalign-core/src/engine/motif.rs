use super::error::AlignError;
use crate::core::models::molecule::Molecule;
use crate::core::query::matcher::{QueryMatch, SubstructureSearch, Vf2Matcher};
use crate::core::query::pattern::PatternQuery;
use tracing::{debug, info};

/// Result of searching a molecule for the torsion motif.
#[derive(Debug, Clone, PartialEq)]
pub enum MotifOutcome {
    NotFound,
    FoundVia {
        /// Index of the query that produced the match, in priority order.
        query_id: usize,
        matched: QueryMatch,
    },
}

impl MotifOutcome {
    /// Converts `NotFound` into [`AlignError::MotifNotFound`].
    pub fn require(
        self,
        molecule: &Molecule,
        queries: usize,
    ) -> Result<(usize, QueryMatch), AlignError> {
        match self {
            Self::FoundVia { query_id, matched } => Ok((query_id, matched)),
            Self::NotFound => Err(AlignError::MotifNotFound {
                title: molecule.title().to_string(),
                queries,
            }),
        }
    }
}

/// Tries motif queries in a fixed priority order.
///
/// Every query is counted so the log shows how each direction fared; the
/// first match of the first query with any match wins.
pub struct MotifFinder<'q, S = Vf2Matcher> {
    queries: &'q [PatternQuery],
    matcher: S,
}

impl<'q> MotifFinder<'q, Vf2Matcher> {
    pub fn new(queries: &'q [PatternQuery]) -> Self {
        Self::with_matcher(queries, Vf2Matcher::new())
    }
}

impl<'q, S: SubstructureSearch> MotifFinder<'q, S> {
    pub fn with_matcher(queries: &'q [PatternQuery], matcher: S) -> Self {
        Self { queries, matcher }
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    pub fn find(&self, molecule: &Molecule) -> MotifOutcome {
        let results: Vec<Vec<QueryMatch>> = self
            .queries
            .iter()
            .map(|query| self.matcher.search(molecule, query))
            .collect();

        let counts: Vec<String> = results
            .iter()
            .enumerate()
            .map(|(i, matches)| format!("query {}={}", i + 1, matches.len()))
            .collect();
        info!("Motif matches in '{}': {}", molecule.title(), counts.join(", "));

        for (query_id, matches) in results.into_iter().enumerate() {
            if let Some(matched) = matches.into_iter().next() {
                debug!(
                    "Using motif query {} ({})",
                    query_id + 1,
                    self.queries[query_id]
                );
                return MotifOutcome::FoundVia { query_id, matched };
            }
        }
        MotifOutcome::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use crate::engine::config::{FORWARD_MOTIF_QUERY, REVERSE_MOTIF_QUERY};
    use nalgebra::Point3;

    fn chain(elements: &[Element], orders: &[BondOrder]) -> Molecule {
        let mut mol = Molecule::new("chain");
        for (i, &element) in elements.iter().enumerate() {
            mol.add_atom(Atom::new(element.symbol(), element, Point3::new(i as f64, 0.0, 0.0)));
        }
        for (i, &order) in orders.iter().enumerate() {
            mol.add_bond(i, i + 1, order).unwrap();
        }
        mol
    }

    fn default_queries() -> Vec<PatternQuery> {
        [FORWARD_MOTIF_QUERY, REVERSE_MOTIF_QUERY]
            .iter()
            .map(|q| PatternQuery::parse(q).unwrap())
            .collect()
    }

    fn motif_molecule() -> Molecule {
        use BondOrder::*;
        chain(
            &[
                Element::OXYGEN,
                Element::CARBON,
                Element::NITROGEN,
                Element::CARBON,
                Element::CARBON,
                Element::SULFUR,
            ],
            &[Double, Single, Single, Single, Single],
        )
    }

    #[test]
    fn first_query_wins_when_both_match() {
        let queries = default_queries();
        let outcome = MotifFinder::new(&queries).find(&motif_molecule());

        match outcome {
            MotifOutcome::FoundVia { query_id, matched } => {
                assert_eq!(query_id, 0);
                assert_eq!(matched.positions.get(1), Some(0));
                assert_eq!(matched.positions.get(4), Some(3));
            }
            MotifOutcome::NotFound => panic!("motif should be found"),
        }
    }

    #[test]
    fn later_query_is_used_when_earlier_ones_fail() {
        let queries = vec![
            PatternQuery::parse("[#8:1]=[#6:2]-[#7:3]-[#6:4]-[#6:5]-[#34:6]").unwrap(),
            PatternQuery::parse(REVERSE_MOTIF_QUERY).unwrap(),
        ];
        let outcome = MotifFinder::new(&queries).find(&motif_molecule());
        assert!(matches!(outcome, MotifOutcome::FoundVia { query_id: 1, .. }));
    }

    #[test]
    fn require_turns_not_found_into_an_error() {
        use BondOrder::*;
        let queries = default_queries();
        let no_sulfur = chain(
            &[Element::OXYGEN, Element::CARBON, Element::NITROGEN, Element::CARBON],
            &[Double, Single, Single],
        );

        let finder = MotifFinder::new(&queries);
        let outcome = finder.find(&no_sulfur);
        assert_eq!(outcome, MotifOutcome::NotFound);

        let error = outcome.require(&no_sulfur, finder.query_count()).unwrap_err();
        assert!(matches!(error, AlignError::MotifNotFound { queries: 2, .. }));
    }
}
