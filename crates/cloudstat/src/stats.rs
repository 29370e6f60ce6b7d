//! Maps requested statistic names onto concrete accumulator collections and
//! implements the output-introspection helpers.

use crate::Error;
use cloudstat_nostd_internal::{
    AccumColVariant, AccumCollection, CentralMoment, CompoundAccumCollection,
    HistogramAccumCollection, OriginMoment, ScalarAccumCollection, WeightedCentralMoment,
    WeightedHistogramAccumCollection, WeightedOriginMoment,
};
use std::collections::HashMap;

/// the fixed statistic names (the omomentK/weightedomomentK families are
/// parsed separately since they embed the order)
const FIXED_STAT_NAMES: [&str; 7] = [
    "mean",
    "variance",
    "cmoment3",
    "weightedmean",
    "weightedvariance",
    "histogram",
    "weightedhistogram",
];

/// One requested statistic: a name plus (for the histogram statistics) the
/// edges of the buckets that the accumulated values get sorted into.
#[derive(Clone, Debug)]
pub struct StatRequest {
    name: String,
    hist_bucket_edges: Option<Vec<f64>>,
}

impl StatRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            hist_bucket_edges: None,
        }
    }

    pub fn with_bucket_edges(name: &str, edges: &[f64]) -> Self {
        Self {
            name: name.to_owned(),
            hist_bucket_edges: Some(edges.to_vec()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn unknown_stat_error(name: &str) -> Error {
    Error::stat_name(
        name.to_owned(),
        FIXED_STAT_NAMES.iter().map(|s| (*s).to_owned()).collect(),
    )
}

/// build the accumulator collection described by a single request
fn build_variant(request: &StatRequest, n_distance_bins: usize) -> Result<AccumColVariant, Error> {
    let name = request.name.as_str();

    // every statistic except the histograms rejects bucket edges
    let is_histogram = matches!(name, "histogram" | "weightedhistogram");
    if !is_histogram && request.hist_bucket_edges.is_some() {
        return Err(Error::bucket_edges(name.to_owned(), false));
    }

    let out = match name {
        "mean" => AccumColVariant::Mean(
            ScalarAccumCollection::from_prototype(CentralMoment::<1>::new(), n_distance_bins)
                .map_err(Error::invalid_input)?,
        ),
        "variance" => AccumColVariant::Variance(
            ScalarAccumCollection::from_prototype(CentralMoment::<2>::new(), n_distance_bins)
                .map_err(Error::invalid_input)?,
        ),
        "cmoment3" => AccumColVariant::CMoment3(
            ScalarAccumCollection::from_prototype(CentralMoment::<3>::new(), n_distance_bins)
                .map_err(Error::invalid_input)?,
        ),
        "weightedmean" => AccumColVariant::WeightedMean(
            ScalarAccumCollection::from_prototype(
                WeightedCentralMoment::<1>::new(),
                n_distance_bins,
            )
            .map_err(Error::invalid_input)?,
        ),
        "weightedvariance" => AccumColVariant::WeightedVariance(
            ScalarAccumCollection::from_prototype(
                WeightedCentralMoment::<2>::new(),
                n_distance_bins,
            )
            .map_err(Error::invalid_input)?,
        ),
        "histogram" | "weightedhistogram" => {
            let Some(ref edges) = request.hist_bucket_edges else {
                return Err(Error::bucket_edges(name.to_owned(), true));
            };
            if name == "histogram" {
                AccumColVariant::Histogram(
                    HistogramAccumCollection::new(n_distance_bins, edges)
                        .map_err(Error::invalid_input)?,
                )
            } else {
                AccumColVariant::WeightedHistogram(
                    WeightedHistogramAccumCollection::new(n_distance_bins, edges)
                        .map_err(Error::invalid_input)?,
                )
            }
        }
        _ => {
            // the origin-moment families carry their order in the name
            if let Some(digits) = name.strip_prefix("weightedomoment") {
                let order = parse_moment_order(name, digits)?;
                AccumColVariant::WeightedOMoment(
                    ScalarAccumCollection::from_prototype(
                        WeightedOriginMoment::new(order).map_err(Error::invalid_input)?,
                        n_distance_bins,
                    )
                    .map_err(Error::invalid_input)?,
                )
            } else if let Some(digits) = name.strip_prefix("omoment") {
                let order = parse_moment_order(name, digits)?;
                AccumColVariant::OMoment(
                    ScalarAccumCollection::from_prototype(
                        OriginMoment::new(order).map_err(Error::invalid_input)?,
                        n_distance_bins,
                    )
                    .map_err(Error::invalid_input)?,
                )
            } else {
                return Err(unknown_stat_error(name));
            }
        }
    };
    Ok(out)
}

fn parse_moment_order(full_name: &str, digits: &str) -> Result<usize, Error> {
    let Ok(order) = digits.parse::<usize>() else {
        return Err(unknown_stat_error(full_name));
    };
    if order == 0 || order > 64 {
        // extreme orders are almost certainly a typo and the running powers
        // would overflow to infinity anyway
        Err(Error::param_range(
            "origin-moment order",
            order as i64,
            1,
            64,
        ))
    } else {
        Ok(order)
    }
}

/// The accumulator resolved from a list of statistic requests.
///
/// A single request stays a bare variant so the calculation can hand the
/// pair loop the concrete collection type; multiple requests become a
/// compound collection.
pub(crate) enum ResolvedAccums {
    Single(AccumColVariant),
    Compound(CompoundAccumCollection),
}

impl ResolvedAccums {
    pub(crate) fn members(&self) -> &[AccumColVariant] {
        match self {
            Self::Single(variant) => std::slice::from_ref(variant),
            Self::Compound(compound) => compound.members(),
        }
    }

    pub(crate) fn requires_weight(&self) -> bool {
        match self {
            Self::Single(variant) => variant.requires_weight(),
            Self::Compound(compound) => compound.requires_weight(),
        }
    }

    pub(crate) fn flt_val_props(&self) -> Vec<(String, usize)> {
        match self {
            Self::Single(variant) => variant.flt_val_props(),
            Self::Compound(compound) => compound.flt_val_props(),
        }
    }

    pub(crate) fn i64_val_props(&self) -> Vec<(String, usize)> {
        match self {
            Self::Single(variant) => variant.i64_val_props(),
            Self::Compound(compound) => compound.i64_val_props(),
        }
    }

    pub(crate) fn total_flt_vals(&self) -> usize {
        match self {
            Self::Single(variant) => variant.total_flt_vals(),
            Self::Compound(compound) => compound.total_flt_vals(),
        }
    }

    pub(crate) fn total_i64_vals(&self) -> usize {
        match self {
            Self::Single(variant) => variant.total_i64_vals(),
            Self::Compound(compound) => compound.total_i64_vals(),
        }
    }

    pub(crate) fn copy_flt_vals(&self, out: &mut [f64]) {
        match self {
            Self::Single(variant) => variant.copy_flt_vals(out),
            Self::Compound(compound) => compound.copy_flt_vals(out),
        }
    }

    pub(crate) fn copy_i64_vals(&self, out: &mut [i64]) {
        match self {
            Self::Single(variant) => variant.copy_i64_vals(out),
            Self::Compound(compound) => compound.copy_i64_vals(out),
        }
    }
}

/// resolve a full request list into a (freshly-purged) accumulator
pub(crate) fn resolve_stat_list(
    stat_list: &[StatRequest],
    n_distance_bins: usize,
) -> Result<ResolvedAccums, Error> {
    match stat_list {
        [] => Err(Error::invalid_input("at least 1 statistic must be requested")),
        [only] => Ok(ResolvedAccums::Single(build_variant(only, n_distance_bins)?)),
        _ => {
            let members = stat_list
                .iter()
                .map(|request| build_variant(request, n_distance_bins))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(ResolvedAccums::Compound(
                CompoundAccumCollection::new(members).map_err(Error::invalid_input)?,
            ))
        }
    }
}

/// Describe the outputs produced for a statistic-request list.
///
/// Returns the ordered `(name, entries_per_distance_bin)` pairs for the
/// real-valued and the integer-valued output components, concatenated across
/// requests in their declared order. A caller sizing the flat output
/// buffers needs `n_distance_bins * sum(entries)` elements of each type.
pub fn output_props(
    stat_list: &[StatRequest],
    n_distance_bins: usize,
) -> Result<(Vec<(String, usize)>, Vec<(String, usize)>), Error> {
    let resolved = resolve_stat_list(stat_list, n_distance_bins)?;
    Ok((resolved.flt_val_props(), resolved.i64_val_props()))
}

/// The unpacked outputs of one requested statistic: each component name
/// mapped to its per-distance-bin values (multi-entry components, i.e.
/// histogram grids, are stored flat with the distance bin as the outer
/// index).
#[derive(Clone, Debug)]
pub struct StatOutput {
    pub stat_name: String,
    pub flt_vals: HashMap<String, Vec<f64>>,
    pub i64_vals: HashMap<String, Vec<i64>>,
}

/// unpack per-member, per-component vectors from the finished accumulator
pub(crate) fn collect_outputs(resolved: &ResolvedAccums) -> Vec<StatOutput> {
    let mut out = Vec::new();
    for member in resolved.members() {
        let n_bins = member.n_distance_bins();

        let mut flt_buf = vec![0.0; member.total_flt_vals()];
        member.copy_flt_vals(&mut flt_buf);
        let mut flt_vals = HashMap::new();
        let mut offset = 0;
        for (name, entries_per_bin) in member.flt_val_props() {
            let len = entries_per_bin * n_bins;
            flt_vals.insert(name, flt_buf[offset..offset + len].to_vec());
            offset += len;
        }

        let mut i64_buf = vec![0_i64; member.total_i64_vals()];
        member.copy_i64_vals(&mut i64_buf);
        let mut i64_vals = HashMap::new();
        let mut offset = 0;
        for (name, entries_per_bin) in member.i64_val_props() {
            let len = entries_per_bin * n_bins;
            i64_vals.insert(name, i64_buf[offset..offset + len].to_vec());
            offset += len;
        }

        out.push(StatOutput {
            stat_name: member.stat_name(),
            flt_vals,
            i64_vals,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        for name in FIXED_STAT_NAMES {
            let request = if name.ends_with("histogram") {
                StatRequest::with_bucket_edges(name, &[0.0, 1.0, 2.0])
            } else {
                StatRequest::new(name)
            };
            let variant = build_variant(&request, 4).unwrap();
            assert_eq!(variant.stat_name(), name);
        }

        let variant = build_variant(&StatRequest::new("omoment3"), 4).unwrap();
        assert_eq!(variant.stat_name(), "omoment3");
        let variant = build_variant(&StatRequest::new("weightedomoment2"), 4).unwrap();
        assert_eq!(variant.stat_name(), "weightedomoment2");
    }

    #[test]
    fn rejects_bad_requests() {
        assert!(build_variant(&StatRequest::new("medianish"), 4).is_err());
        // the weighted 3rd-order central moment isn't implemented
        assert!(build_variant(&StatRequest::new("weightedcmoment3"), 4).is_err());
        assert!(build_variant(&StatRequest::new("omoment0"), 4).is_err());
        assert!(build_variant(&StatRequest::new("omomentx"), 4).is_err());
        // histograms need bucket edges; nothing else accepts them
        assert!(build_variant(&StatRequest::new("histogram"), 4).is_err());
        assert!(
            build_variant(&StatRequest::with_bucket_edges("mean", &[0.0, 1.0]), 4).is_err()
        );
    }

    #[test]
    fn output_props_concatenate_in_request_order() {
        let stat_list = [
            StatRequest::new("variance"),
            StatRequest::with_bucket_edges("histogram", &[0.0, 1.0, 2.0, 3.0]),
        ];
        let (flt_props, i64_props) = output_props(&stat_list, 5).unwrap();
        assert_eq!(
            flt_props,
            vec![("mean".to_owned(), 1), ("variance*count".to_owned(), 1)]
        );
        assert_eq!(
            i64_props,
            vec![("count".to_owned(), 1), ("bin_counts".to_owned(), 3)]
        );
    }
}
