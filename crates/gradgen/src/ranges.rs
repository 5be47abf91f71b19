use crate::ir::{list_size_field, IndexRange, ListSizeField, RangeLength, SymbolicSize};
use crate::schema::ArgSpec;

/// Slot layout of the flat gradient vector for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangePlan {
    pub ranges: Vec<IndexRange>,
    pub list_size_fields: Vec<ListSizeField>,
    pub total: SymbolicSize,
}

/// Assigns contiguous ranges to gradient arguments in declaration order.
///
/// List arguments get a length read from a remembered size field; every
/// other argument takes exactly one slot.
pub fn allocate_ranges(args: &[ArgSpec]) -> RangePlan {
    let mut plan = RangePlan::default();
    for arg in args {
        let length = if arg.is_list() {
            let field = list_size_field(&arg.name);
            plan.list_size_fields.push(ListSizeField {
                arg: arg.name.clone(),
                field: field.clone(),
            });
            RangeLength::ListSize { field }
        } else {
            RangeLength::One
        };
        let range = IndexRange {
            arg: arg.name.clone(),
            start: plan.total.clone(),
            length,
        };
        plan.total = range.end();
        plan.ranges.push(range);
    }
    plan
}
