//! Contact pair interface and pair factories
//!
//! Pair types are monomorphized over the combined DOF count of their two
//! elements so that the forward-mode derivatives live on the stack. The
//! factories pick the instantiation from the runtime element shapes.

use crate::config::{ContactParameters, ProjectionParameters};
use crate::contact::line_contact::BeamToBeamLineContactPair;
use crate::contact::point_coupling::BeamToBeamPointCouplingPair;
use crate::contact::types::{ContactPoint, LocalContribution, Segment};
use crate::error::{ContactSearchError, Result};
use crate::mesh::types::{BeamElement, CurveShape, Discretization};

/// An interaction between two beam elements
pub trait ContactPair: Send + Sync {
    /// `(element1, element2)`, slave first for line contact
    fn element_gids(&self) -> (usize, usize);

    /// Verify the elements and prepare the evaluation
    fn setup(&mut self, disc: &dyn Discretization) -> Result<()>;

    /// Evaluate force and stiffness in the current configuration
    ///
    /// Returns `None` if the pair is not active.
    fn evaluate(&mut self, disc: &dyn Discretization) -> Result<Option<LocalContribution>>;

    /// Active points of the last evaluation
    fn contact_points(&self) -> &[ContactPoint];

    /// Active segments of the last evaluation
    fn segments(&self) -> &[Segment];

    /// Largest number of segments the pair type supports, `None` if unbounded
    fn max_segments(&self) -> Option<usize>;
}

/// Check that the runtime element still has the shape a pair was created for
pub(crate) fn check_element<'a>(
    disc: &'a dyn Discretization,
    gid: usize,
    shape: CurveShape,
) -> Result<&'a BeamElement> {
    let element = disc.element(gid)?;
    if element.shape != shape {
        return Err(ContactSearchError::InvalidElementType {
            expected: format!("{} for element {}", shape, gid),
            found: element.shape.to_string(),
        });
    }
    Ok(element)
}

/// Check that two elements fit a pair instantiated for `ndof` DOFs
pub(crate) fn check_pair_dofs(
    element1: &BeamElement,
    element2: &BeamElement,
    ndof: usize,
) -> Result<()> {
    let found = element1.shape.num_dofs() + element2.shape.num_dofs();
    if found != ndof {
        return Err(ContactSearchError::InvalidElementType {
            expected: format!("element pair with {} DOFs", ndof),
            found: format!(
                "{} and {} with {} DOFs",
                element1.shape, element2.shape, found
            ),
        });
    }
    Ok(())
}

macro_rules! dispatch_ndof {
    ($ndof:expr, $pair:ident, $element1:expr, $element2:expr, $($arg:expr),*) => {
        match $ndof {
            12 => Ok(Box::new($pair::<12>::new($element1, $element2, $($arg),*)?)),
            15 => Ok(Box::new($pair::<15>::new($element1, $element2, $($arg),*)?)),
            18 => Ok(Box::new($pair::<18>::new($element1, $element2, $($arg),*)?)),
            21 => Ok(Box::new($pair::<21>::new($element1, $element2, $($arg),*)?)),
            24 => Ok(Box::new($pair::<24>::new($element1, $element2, $($arg),*)?)),
            27 => Ok(Box::new($pair::<27>::new($element1, $element2, $($arg),*)?)),
            30 => Ok(Box::new($pair::<30>::new($element1, $element2, $($arg),*)?)),
            other => Err(ContactSearchError::InvalidElementType {
                expected: "element pair with 12 to 30 DOFs".to_string(),
                found: format!(
                    "{} and {} with {} DOFs",
                    $element1.shape, $element2.shape, other
                ),
            }),
        }
    };
}

/// Create a penalty line contact pair for a slave and a master element
pub fn create_line_contact_pair(
    slave: &BeamElement,
    master: &BeamElement,
    contact: &ContactParameters,
    projection: &ProjectionParameters,
) -> Result<Box<dyn ContactPair>> {
    let ndof = slave.shape.num_dofs() + master.shape.num_dofs();
    dispatch_ndof!(ndof, BeamToBeamLineContactPair, slave, master, contact, projection)
}

/// Create a penalty point coupling pair with coupling points `(xi1, xi2)`
pub fn create_point_coupling_pair(
    element1: &BeamElement,
    element2: &BeamElement,
    penalty_parameter: f64,
    coupling_points: Vec<(f64, f64)>,
) -> Result<Box<dyn ContactPair>> {
    let ndof = element1.shape.num_dofs() + element2.shape.num_dofs();
    dispatch_ndof!(
        ndof,
        BeamToBeamPointCouplingPair,
        element1,
        element2,
        penalty_parameter,
        coupling_points
    )
}
