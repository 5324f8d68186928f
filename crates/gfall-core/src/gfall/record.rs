use crate::domain::{GfallError, GfallResult};
use crate::formats::fortran::{FieldValue, FixedWidthLayout, RawRecord};

/// `FORMAT(F11.4,F7.3,F6.2,F12.3,F5.2,1X,A10,F12.3,F5.2,1X,A10,3F6.2,A4,2I2,I3,F6.3,I3,F6.3,2I5,1X,A1,A1,1X,A1,A1,I1,A3,2I5,I6)`
/// with the hyperfine F values read as integers.
pub const GFALL_FORTRAN_FORMAT: &str = "F11.4,F7.3,F6.2,F12.3,F5.2,1X,A10,F12.3,F5.2,1X,\
     A10,F6.2,F6.2,F6.2,A4,I2,I2,I3,F6.3,I3,F6.3,I5,I5,\
     1X,I1,A1,1X,I1,A1,I1,A3,I5,I5,I6";

pub const GFALL_COLUMNS: [&str; 34] = [
    "wavelength",
    "loggf",
    "element_code",
    "e_first",
    "j_first",
    "blank1",
    "label_first",
    "e_second",
    "j_second",
    "blank2",
    "label_second",
    "log_gamma_rad",
    "log_gamma_stark",
    "log_gamma_vderwaals",
    "ref",
    "nlte_level_no_first",
    "nlte_level_no_second",
    "isotope",
    "log_f_hyperfine",
    "isotope2",
    "log_iso_abundance",
    "hyper_shift_first",
    "hyper_shift_second",
    "blank3",
    "hyperfine_f_first",
    "hyperfine_note_first",
    "blank4",
    "hyperfine_f_second",
    "hyperfine_note_second",
    "line_strength_class",
    "line_code",
    "lande_g_first",
    "lande_g_second",
    "isotopic_shift",
];

pub fn gfall_layout() -> GfallResult<FixedWidthLayout> {
    FixedWidthLayout::from_descriptor(GFALL_FORTRAN_FORMAT, &GFALL_COLUMNS)
}

/// One level column group as tabulated, before lower/upper resolution.
/// `energy` keeps its sign: negative marks a predicted level.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLevelSide {
    pub energy: f64,
    pub j: f64,
    pub label: String,
    pub nlte_level_no: Option<i64>,
    pub hyper_shift: Option<i64>,
    pub hyperfine_f: Option<i64>,
    pub hyperfine_note: Option<String>,
    pub lande_g: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineExtras {
    pub log_gamma_rad: Option<f64>,
    pub log_gamma_stark: Option<f64>,
    pub log_gamma_vderwaals: Option<f64>,
    pub reference: Option<String>,
    pub isotope: Option<i64>,
    pub log_f_hyperfine: Option<f64>,
    pub isotope2: Option<i64>,
    pub log_iso_abundance: Option<f64>,
    pub line_strength_class: Option<i64>,
    pub line_code: Option<String>,
    pub isotopic_shift: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawGfallRow {
    pub line_number: usize,
    pub wavelength: f64,
    pub loggf: f64,
    pub element_code: f64,
    pub first: RawLevelSide,
    pub second: RawLevelSide,
    pub extras: LineExtras,
}

struct SideColumns {
    energy: usize,
    j: usize,
    label: usize,
    nlte_level_no: usize,
    hyper_shift: usize,
    hyperfine_f: usize,
    hyperfine_note: usize,
    lande_g: usize,
}

/// Column positions of a gfall layout, resolved once per file.
pub struct GfallColumns {
    wavelength: usize,
    loggf: usize,
    element_code: usize,
    first: SideColumns,
    second: SideColumns,
    log_gamma_rad: usize,
    log_gamma_stark: usize,
    log_gamma_vderwaals: usize,
    reference: usize,
    isotope: usize,
    log_f_hyperfine: usize,
    isotope2: usize,
    log_iso_abundance: usize,
    line_strength_class: usize,
    line_code: usize,
    isotopic_shift: usize,
}

impl GfallColumns {
    pub fn resolve(layout: &FixedWidthLayout) -> GfallResult<Self> {
        let column = |name: &str| {
            layout.column_index(name).ok_or_else(|| {
                GfallError::format(
                    "FORMAT.COLUMN_MISSING",
                    format!("gfall layout has no column '{name}'"),
                )
            })
        };
        let side = |suffix: &str| -> GfallResult<SideColumns> {
            Ok(SideColumns {
                energy: column(&format!("e_{suffix}"))?,
                j: column(&format!("j_{suffix}"))?,
                label: column(&format!("label_{suffix}"))?,
                nlte_level_no: column(&format!("nlte_level_no_{suffix}"))?,
                hyper_shift: column(&format!("hyper_shift_{suffix}"))?,
                hyperfine_f: column(&format!("hyperfine_f_{suffix}"))?,
                hyperfine_note: column(&format!("hyperfine_note_{suffix}"))?,
                lande_g: column(&format!("lande_g_{suffix}"))?,
            })
        };

        Ok(Self {
            wavelength: column("wavelength")?,
            loggf: column("loggf")?,
            element_code: column("element_code")?,
            first: side("first")?,
            second: side("second")?,
            log_gamma_rad: column("log_gamma_rad")?,
            log_gamma_stark: column("log_gamma_stark")?,
            log_gamma_vderwaals: column("log_gamma_vderwaals")?,
            reference: column("ref")?,
            isotope: column("isotope")?,
            log_f_hyperfine: column("log_f_hyperfine")?,
            isotope2: column("isotope2")?,
            log_iso_abundance: column("log_iso_abundance")?,
            line_strength_class: column("line_strength_class")?,
            line_code: column("line_code")?,
            isotopic_shift: column("isotopic_shift")?,
        })
    }

    pub fn row(&self, layout: &FixedWidthLayout, record: &RawRecord) -> GfallResult<RawGfallRow> {
        let fields = RecordFields { layout, record };
        Ok(RawGfallRow {
            line_number: record.line_number,
            wavelength: fields.required_f64(self.wavelength)?,
            loggf: fields.required_f64(self.loggf)?,
            element_code: fields.required_f64(self.element_code)?,
            first: fields.side(&self.first)?,
            second: fields.side(&self.second)?,
            extras: LineExtras {
                log_gamma_rad: fields.value(self.log_gamma_rad).as_f64(),
                log_gamma_stark: fields.value(self.log_gamma_stark).as_f64(),
                log_gamma_vderwaals: fields.value(self.log_gamma_vderwaals).as_f64(),
                reference: fields.text(self.reference),
                isotope: fields.value(self.isotope).as_i64(),
                log_f_hyperfine: fields.value(self.log_f_hyperfine).as_f64(),
                isotope2: fields.value(self.isotope2).as_i64(),
                log_iso_abundance: fields.value(self.log_iso_abundance).as_f64(),
                line_strength_class: fields.value(self.line_strength_class).as_i64(),
                line_code: fields.text(self.line_code),
                isotopic_shift: fields.value(self.isotopic_shift).as_i64(),
            },
        })
    }
}

struct RecordFields<'a> {
    layout: &'a FixedWidthLayout,
    record: &'a RawRecord,
}

impl RecordFields<'_> {
    fn value(&self, index: usize) -> &FieldValue {
        &self.record.values[index]
    }

    fn text(&self, index: usize) -> Option<String> {
        self.value(index).as_text().map(str::to_string)
    }

    fn required_f64(&self, index: usize) -> GfallResult<f64> {
        self.value(index).as_f64().ok_or_else(|| {
            GfallError::format(
                "FORMAT.FIELD",
                format!(
                    "line {}: required field '{}' is empty",
                    self.record.line_number,
                    self.layout.columns()[index].name
                ),
            )
        })
    }

    fn side(&self, columns: &SideColumns) -> GfallResult<RawLevelSide> {
        let j = self.required_f64(columns.j)?;
        if j < 0.0 {
            return Err(GfallError::format(
                "FORMAT.FIELD",
                format!(
                    "line {}: field '{}' has negative angular momentum {j}",
                    self.record.line_number,
                    self.layout.columns()[columns.j].name
                ),
            ));
        }

        Ok(RawLevelSide {
            energy: self.required_f64(columns.energy)?,
            j,
            label: self.text(columns.label).unwrap_or_default(),
            nlte_level_no: self.value(columns.nlte_level_no).as_i64(),
            hyper_shift: self.value(columns.hyper_shift).as_i64(),
            hyperfine_f: self.value(columns.hyperfine_f).as_i64(),
            hyperfine_note: self.text(columns.hyperfine_note),
            lande_g: self.value(columns.lande_g).as_i64(),
        })
    }
}

pub fn decode_gfall_source(layout: &FixedWidthLayout, source: &str) -> GfallResult<Vec<RawGfallRow>> {
    let columns = GfallColumns::resolve(layout)?;
    layout
        .decode_source(source)?
        .iter()
        .map(|record| columns.row(layout, record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{GFALL_COLUMNS, decode_gfall_source, gfall_layout};

    const SAMPLE: &str =
        "    72.5206 -4.327 26.01  121169.950  4.5 s6D)4d e6D  259068.650  4.5 (7S)6f 8F   8.49 -4.77 -7.60K88  0 0  0 0.000  0 0.000    0    0           1180 1120     0";

    #[test]
    fn gfall_layout_spans_160_columns() {
        let layout = gfall_layout().unwrap();
        assert_eq!(layout.total_width(), 160);
        assert_eq!(layout.columns().len(), GFALL_COLUMNS.len() - 4);
    }

    #[test]
    fn sample_line_decodes_both_level_sides() {
        let layout = gfall_layout().unwrap();
        let rows = decode_gfall_source(&layout, SAMPLE).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.wavelength, 72.5206);
        assert_eq!(row.loggf, -4.327);
        assert_eq!(row.element_code, 26.01);
        assert_eq!(row.first.energy, 121169.950);
        assert_eq!(row.first.j, 4.5);
        assert_eq!(row.first.label, "s6D)4d e6D");
        assert_eq!(row.second.energy, 259068.650);
        assert_eq!(row.second.label, "(7S)6f 8F");
        assert_eq!(row.extras.reference.as_deref(), Some("K88"));
        assert_eq!(row.extras.log_gamma_rad, Some(8.49));
        assert_eq!(row.first.lande_g, Some(1180));
        assert_eq!(row.second.lande_g, Some(1120));
        assert_eq!(row.extras.isotopic_shift, Some(0));
    }

    #[test]
    fn missing_energy_is_a_format_error() {
        let layout = gfall_layout().unwrap();
        let error = decode_gfall_source(&layout, "    72.5206 -4.327 26.01").unwrap_err();
        assert_eq!(error.placeholder(), "FORMAT.FIELD");
        assert!(error.message().contains("'e_first'"));
    }

    #[test]
    fn negative_j_is_a_format_error() {
        let layout = gfall_layout().unwrap();
        let line = SAMPLE.replacen("  4.5 s6D)4d", " -4.5 s6D)4d", 1);
        let error = decode_gfall_source(&layout, &format!("\n{line}")).unwrap_err();
        assert_eq!(error.placeholder(), "FORMAT.FIELD");
        assert!(error.message().contains("line 2"));
        assert!(error.message().contains("'j_first'"));
    }
}
