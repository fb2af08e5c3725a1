//! # Ventilation Loss Calculation
//!
//! Air-renewal heat loss of each ventilation installation: mechanical or
//! natural ventilation (`Hvent`) plus infiltration through the envelope
//! (`Hperm`). Infiltration starts from the conventional permeability under
//! 4 Pa, refined for old buildings by the final [`SurfaceStatistics`].
//!
//! ## Formulas
//!
//! ```text
//! Sdep_i   = Sdep × Sh_i / ΣSh
//! Q4Pa_env = Q4Pa_conv × Sdep_i
//! Q4Pa     = Q4Pa_env + 0.45 × Smea × Sh_i
//! n50      = Q4Pa / ((4/50)^(2/3) × Hsp × Sh_i)
//! Qvinf    = Hsp × Sh_i × n50 × e / (1 + f/e × ((Qvasouf - Qvarep) / (Hsp × n50))²)
//! Hvent    = 0.34 × Qvarep × Sh_i
//! Hperm    = 0.34 × Qvinf
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::reference::{Query, ReferenceData, TableName};
use crate::statistics::SurfaceStatistics;

/// Volumetric heat capacity of air, Wh/(m3.K)
pub const AIR_HEAT_CAPACITY: f64 = 0.34;

/// Conventional permeability substituted when the table has no row, m3/(h.m2)
pub const FALLBACK_Q4PA_CONV: f64 = 4.0;

/// Share of the air inlet module counted as leakage
const SMEA_LEAKAGE_FACTOR: f64 = 0.45;

/// Wind protection coefficients `(e, f)`
pub const SEVERAL_FACADES_PROTECTION: (f64, f64) = (0.07, 15.0);
pub const ONE_FACADE_PROTECTION: (f64, f64) = (0.02, 20.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VentilationKind {
    #[default]
    NaturalWindowOpening,
    NaturalInletsOutlets,
    NaturalDuct,
    #[serde(rename = "extract_self_regulating_pre_1982")]
    ExtractSelfRegulatingPre1982,
    ExtractSelfRegulating,
    ExtractHygroA,
    ExtractHygroB,
    Balanced,
    BalancedHeatRecovery,
}

impl VentilationKind {
    pub const ALL: [VentilationKind; 9] = [
        VentilationKind::NaturalWindowOpening,
        VentilationKind::NaturalInletsOutlets,
        VentilationKind::NaturalDuct,
        VentilationKind::ExtractSelfRegulatingPre1982,
        VentilationKind::ExtractSelfRegulating,
        VentilationKind::ExtractHygroA,
        VentilationKind::ExtractHygroB,
        VentilationKind::Balanced,
        VentilationKind::BalancedHeatRecovery,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            VentilationKind::NaturalWindowOpening => "natural_window_opening",
            VentilationKind::NaturalInletsOutlets => "natural_inlets_outlets",
            VentilationKind::NaturalDuct => "natural_duct",
            VentilationKind::ExtractSelfRegulatingPre1982 => "extract_self_regulating_pre_1982",
            VentilationKind::ExtractSelfRegulating => "extract_self_regulating",
            VentilationKind::ExtractHygroA => "extract_hygro_a",
            VentilationKind::ExtractHygroB => "extract_hygro_b",
            VentilationKind::Balanced => "balanced",
            VentilationKind::BalancedHeatRecovery => "balanced_heat_recovery",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VentilationKind::NaturalWindowOpening => "Natural (window opening)",
            VentilationKind::NaturalInletsOutlets => "Natural (inlets and outlets)",
            VentilationKind::NaturalDuct => "Natural (duct)",
            VentilationKind::ExtractSelfRegulatingPre1982 => "Self-regulating extract (before 1982)",
            VentilationKind::ExtractSelfRegulating => "Self-regulating extract",
            VentilationKind::ExtractHygroA => "Humidity-controlled extract (A)",
            VentilationKind::ExtractHygroB => "Humidity-controlled extract (B)",
            VentilationKind::Balanced => "Balanced",
            VentilationKind::BalancedHeatRecovery => "Balanced with heat recovery",
        }
    }
}

impl std::fmt::Display for VentilationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn default_true() -> bool {
    true
}

/// One ventilation installation.
///
/// ```json
/// { "reference": "VMC", "kind": "extract_hygro_b", "ventilated_area_m2": 92.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentilationEntry {
    pub reference: String,

    #[serde(default)]
    pub kind: VentilationKind,

    /// Area served, m²; the habitable surface when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ventilated_area_m2: Option<f64>,

    #[serde(default = "default_true")]
    pub multiple_exposed_facades: bool,

    /// Measured permeability under 4 Pa, m3/(h.m2), replaces the table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q4pa_measured: Option<f64>,
}

impl VentilationEntry {
    pub fn new(reference: impl Into<String>, kind: VentilationKind) -> Self {
        Self {
            reference: reference.into(),
            kind,
            ventilated_area_m2: None,
            multiple_exposed_facades: true,
            q4pa_measured: None,
        }
    }
}

/// Conventional flows of one ventilation kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConventionalFlows {
    pub qvarep: f64,
    pub qvasouf: f64,
    pub smea: f64,
}

impl ConventionalFlows {
    /// Natural ventilation by window opening, used when a kind has no row
    pub const FALLBACK: ConventionalFlows = ConventionalFlows {
        qvarep: 1.2,
        qvasouf: 1.2,
        smea: 0.0,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationResult {
    pub reference: String,
    pub kind: VentilationKind,
    /// Ventilated area Sh_i, m²
    pub sh_m2: f64,
    /// Share of the deperditive area, m²
    pub sdep_m2: f64,
    pub q4pa_conv: f64,
    pub q4pa_env: f64,
    pub q4pa: f64,
    pub n50: f64,
    pub flows: ConventionalFlows,
    /// Infiltration flow, m3/h
    pub qvinf: f64,
    /// Ventilation loss, W/K
    pub hvent: f64,
    /// Infiltration loss, W/K
    pub hperm: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VentilationResult {
    pub installations: Vec<InstallationResult>,
    pub hvent: f64,
    pub hperm: f64,
}

impl VentilationResult {
    /// `Hvent + Hperm`, W/K
    pub fn total(&self) -> f64 {
        self.hvent + self.hperm
    }
}

/// `n50` from the permeability under 4 Pa.
pub fn n50(q4pa: f64, ceiling_height_m: f64, sh_m2: f64) -> f64 {
    let volume = (4.0_f64 / 50.0).powf(2.0 / 3.0) * ceiling_height_m * sh_m2;
    if volume > 0.0 {
        q4pa / volume
    } else {
        0.0
    }
}

/// Infiltration flow, m3/h.
pub fn infiltration_flow(
    ceiling_height_m: f64,
    sh_m2: f64,
    n50: f64,
    flows: &ConventionalFlows,
    protection: (f64, f64),
) -> f64 {
    let (e, f) = protection;
    let air_change = ceiling_height_m * n50;
    if air_change <= 0.0 {
        return 0.0;
    }
    let unbalance = (flows.qvasouf - flows.qvarep) / air_change;
    ceiling_height_m * sh_m2 * n50 * e / (1.0 + f / e * unbalance * unbalance)
}

pub struct VentilationCalculator<'a> {
    reference: &'a ReferenceData,
    context: &'a Context,
}

impl<'a> VentilationCalculator<'a> {
    pub fn new(reference: &'a ReferenceData, context: &'a Context) -> Self {
        Self { reference, context }
    }

    /// Conventional permeability of the dwelling, m3/(h.m2).
    pub fn conventional_permeability(&self, statistics: &SurfaceStatistics, element: &str, diagnostics: &mut Diagnostics) -> f64 {
        let mut query = Query::new()
            .eq("building", self.context.building_type.code())
            .eq("period", self.context.period.code());
        if self.context.period.permeability_refined() {
            query = query
                .eq("insulated_majority", statistics.is_mostly_insulated())
                .eq("weatherstripped_majority", statistics.is_mostly_weatherstripped());
        }
        match self.reference.table(TableName::Q4paConv).value(&query, "q4pa_conv") {
            Ok(q) => q,
            Err(e) => {
                diagnostics.record(element, &e, FALLBACK_Q4PA_CONV);
                FALLBACK_Q4PA_CONV
            }
        }
    }

    fn flows(&self, entry: &VentilationEntry, diagnostics: &mut Diagnostics) -> ConventionalFlows {
        let query = Query::new().eq("kind", entry.kind.code());
        let row = match self.reference.table(TableName::Ventilation).find(&query) {
            Ok(row) => row,
            Err(e) => {
                diagnostics.record(&entry.reference, &e, VentilationKind::NaturalWindowOpening.code());
                return ConventionalFlows::FALLBACK;
            }
        };
        match (row.number("qvarep_conv"), row.number("qvasouf_conv"), row.number("smea_conv")) {
            (Some(qvarep), Some(qvasouf), Some(smea)) => ConventionalFlows { qvarep, qvasouf, smea },
            _ => {
                diagnostics.resolution_failure(
                    &entry.reference,
                    format!("incomplete ventilation row for '{}'", entry.kind.code()),
                    VentilationKind::NaturalWindowOpening.code(),
                );
                ConventionalFlows::FALLBACK
            }
        }
    }

    /// Losses of every installation, from the final surface statistics.
    pub fn compute(
        &self,
        entries: &[VentilationEntry],
        statistics: &SurfaceStatistics,
        diagnostics: &mut Diagnostics,
    ) -> VentilationResult {
        let defaulted;
        let entries = if entries.is_empty() {
            diagnostics.inconsistency(
                "ventilation",
                "no ventilation installation",
                VentilationKind::NaturalWindowOpening.code(),
            );
            defaulted = [VentilationEntry::new("ventilation", VentilationKind::NaturalWindowOpening)];
            &defaulted[..]
        } else {
            entries
        };

        let sh = self.context.habitable_surface_m2;
        let hsp = self.context.ceiling_height_m;
        let served: Vec<f64> = entries.iter().map(|e| e.ventilated_area_m2.unwrap_or(sh)).collect();
        let total_served: f64 = served.iter().sum();

        let mut result = VentilationResult::default();
        for (entry, sh_i) in entries.iter().zip(served) {
            let sdep = if total_served > 0.0 {
                statistics.deperditive_area_m2 * sh_i / total_served
            } else {
                0.0
            };
            let q4pa_conv = match entry.q4pa_measured {
                Some(q) => q,
                None => self.conventional_permeability(statistics, &entry.reference, diagnostics),
            };
            let flows = self.flows(entry, diagnostics);

            let q4pa_env = q4pa_conv * sdep;
            let q4pa = q4pa_env + SMEA_LEAKAGE_FACTOR * flows.smea * sh_i;
            let n50 = n50(q4pa, hsp, sh_i);
            let protection = if entry.multiple_exposed_facades {
                SEVERAL_FACADES_PROTECTION
            } else {
                ONE_FACADE_PROTECTION
            };
            let qvinf = infiltration_flow(hsp, sh_i, n50, &flows, protection);
            let hvent = AIR_HEAT_CAPACITY * flows.qvarep * sh_i;
            let hperm = AIR_HEAT_CAPACITY * qvinf;

            debug!(
                installation = %entry.reference,
                kind = entry.kind.code(),
                q4pa_conv,
                n50,
                hvent,
                hperm,
                "ventilation losses"
            );

            result.hvent += hvent;
            result.hperm += hperm;
            result.installations.push(InstallationResult {
                reference: entry.reference.clone(),
                kind: entry.kind,
                sh_m2: sh_i,
                sdep_m2: sdep,
                q4pa_conv,
                q4pa_env,
                q4pa,
                n50,
                flows,
                qvinf,
                hvent,
                hperm,
            });
        }
        result
    }
}
