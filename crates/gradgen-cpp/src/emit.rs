use gradgen::error::{GenError, GenResult};
use gradgen::ir::{
    range_binding, BaseClass, BodyStatement, DerivativeBlock, GeneratedFunction, GradInputMask,
    IndexRange, RangeLength, ReleaseStmt, SavedEntry, StorageKind, UnpackStmt, GRAD_INPUT_MASK,
};

use crate::utils::{escape_c_string, push_block, push_line};

pub(crate) fn superclass(base: BaseClass) -> &'static str {
    match base {
        BaseClass::Traceable => "TraceableFunction",
        BaseClass::Opaque => "Function",
    }
}

pub(crate) fn emit_declaration(function: &GeneratedFunction) -> String {
    let op = &function.op;
    let base = superclass(function.base);
    let op_literal = escape_c_string(op);

    let mut out = String::new();
    push_block(
        &mut out,
        0,
        &format!(
            r#"
                struct {op} : public {base} {{
                  using {base}::{base};
                  variable_list apply(const variable_list& grads) override;
                  std::string name() override {{ return "{op_literal}"; }}
                  void releaseVariables() override {{
            "#
        ),
    );
    for release in &function.releases {
        push_line(&mut out, 2, &release_statement(release));
    }
    push_line(&mut out, 1, "}");
    for entry in &function.saved {
        push_line(&mut out, 1, &saved_field(entry));
    }
    for size in &function.list_size_fields {
        push_line(&mut out, 1, &format!("size_t {};", size.field));
    }
    push_line(&mut out, 0, "};");
    out
}

pub(crate) fn emit_definition(function: &GeneratedFunction) -> GenResult<String> {
    let op = &function.op;
    let mut out = String::new();
    push_line(
        &mut out,
        0,
        &format!("variable_list {op}::apply(const variable_list& grads) {{"),
    );
    push_line(&mut out, 1, "IndexRangeGenerator gen;");
    for range in &function.index_ranges {
        push_line(&mut out, 1, &index_range_statement(range));
    }
    push_line(&mut out, 1, "variable_list grad_inputs(gen.size());");
    for stmt in &function.body {
        match stmt {
            BodyStatement::GradAlias => push_line(&mut out, 1, "auto& grad = grads[0];"),
            BodyStatement::Unpack(unpack) => push_line(&mut out, 1, &unpack_statement(unpack)),
            BodyStatement::Derivative(block) => {
                check_block_ranges(function, block)?;
                emit_derivative_block(&mut out, block);
            }
        }
    }
    push_line(&mut out, 1, "return grad_inputs;");
    push_line(&mut out, 0, "}");
    Ok(out)
}

pub(crate) fn emit_registration(function: &GeneratedFunction) -> String {
    let op = &function.op;
    let op_literal = escape_c_string(op);
    let mut out = String::new();
    push_line(&mut out, 0, &format!("static PyTypeObject {op}Class;"));
    push_line(
        &mut out,
        0,
        &format!("addClass<{op}>({op}Class, \"{op_literal}\");"),
    );
    out
}

fn saved_field(entry: &SavedEntry) -> String {
    let field = entry.field();
    match entry.storage {
        StorageKind::OpaqueHolder => format!("SavedVariable {field};"),
        StorageKind::ListCopy => format!("std::vector<int64_t> {field};"),
        StorageKind::Verbatim => format!("{} {field};", entry.ty.spelling()),
    }
}

fn release_statement(release: &ReleaseStmt) -> String {
    format!("{}.data.reset();", release.field)
}

fn unpack_statement(unpack: &UnpackStmt) -> String {
    let owner = if unpack.owner_ref {
        "shared_from_this()"
    } else {
        ""
    };
    format!("auto {} = {}.unpack({owner});", unpack.name, unpack.field)
}

fn index_range_statement(range: &IndexRange) -> String {
    let size = match &range.length {
        RangeLength::One => "1",
        RangeLength::ListSize { field } => field.as_str(),
    };
    format!("auto {} = gen.range({size});", range.binding())
}

fn check_block_ranges(function: &GeneratedFunction, block: &DerivativeBlock) -> GenResult<()> {
    for var in block.vars() {
        if !function.index_ranges.iter().any(|range| range.arg == var) {
            return Err(GenError::render(format!(
                "{}: derivative for '{var}' has no index range",
                function.op
            )));
        }
    }
    Ok(())
}

fn should_compute(vars: &[&str]) -> String {
    let ranges = vars
        .iter()
        .map(|var| range_binding(var))
        .collect::<Vec<_>>()
        .join(", ");
    format!("should_compute_output({{ {ranges} }})")
}

fn emit_derivative_block(out: &mut String, block: &DerivativeBlock) {
    push_line(out, 1, &format!("if ({}) {{", should_compute(&block.vars())));
    if let DerivativeBlock::Multi {
        mask: Some(mask), ..
    } = block
    {
        emit_grad_input_mask(out, mask);
    }
    // Formulas are user text and may span lines; they are never re-indented.
    push_line(out, 2, &format!("auto grad_result = {};", block.formula()));
    match block {
        DerivativeBlock::Single { var, .. } => {
            let ix = range_binding(var);
            push_line(out, 2, &format!("copy_range(grad_inputs, {ix}, grad_result);"));
        }
        DerivativeBlock::Multi { vars, .. } => {
            for (index, var) in vars.iter().enumerate() {
                let ix = range_binding(var);
                push_line(
                    out,
                    2,
                    &format!("copy_range(grad_inputs, {ix}, std::get<{index}>(grad_result));"),
                );
            }
        }
    }
    push_line(out, 1, "}");
}

fn emit_grad_input_mask(out: &mut String, mask: &GradInputMask) {
    push_line(
        out,
        2,
        &format!(
            "auto {GRAD_INPUT_MASK} = std::array<bool, {}>{{",
            mask.len()
        ),
    );
    for var in &mask.vars {
        push_line(out, 3, &format!("{},", should_compute(&[var.as_str()])));
    }
    push_line(out, 2, "};");
}
