use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    spanned::Spanned,
    BinOp, Block, Expr, Ident, Pat, Stmt, Token, UnOp,
};

struct GraphBlock {
    graph: Expr,
    block: Block,
}

impl Parse for GraphBlock {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let graph = input.parse()?;
        input.parse::<Token![,]>()?;
        let block = input.parse()?;
        Ok(Self { graph, block })
    }
}

/// Build graph nodes from ordinary arithmetic.
///
/// `hypograd!(graph, { let x = 2.; let f = x * x + 1.; })` binds `x` to a
/// tracked leaf and `f` to the resulting node in the enclosing scope.
/// Literals inside expressions become untracked constants. Only `+` and `*`
/// are accepted.
#[proc_macro]
pub fn hypograd(input: TokenStream) -> TokenStream {
    let GraphBlock { graph, block } = parse_macro_input!(input as GraphBlock);

    let mut terms = vec![quote! {
        let __hypograd_graph: &::hypograd::Graph = &#graph;
    }];

    for stmt in &block.stmts {
        if let Err(e) = traverse_stmt(stmt, &mut terms) {
            return e.to_compile_error().into();
        }
    }

    let expanded = quote! {
        #(#terms)*
    };

    TokenStream::from(expanded)
}

fn traverse_stmt(input: &Stmt, terms: &mut Vec<TokenStream2>) -> syn::Result<()> {
    match input {
        Stmt::Local(local) => {
            let Pat::Ident(id) = &local.pat else {
                return Err(syn::Error::new(local.pat.span(), "expected a plain binding"));
            };
            let Some(init) = &local.init else {
                return Err(syn::Error::new(local.span(), "binding needs an initializer"));
            };
            let name = id.ident.clone();
            let ts = if let Some(value) = literal(&init.expr) {
                quote! {
                    let #name = __hypograd_graph.var(#value);
                }
            } else {
                let res = traverse_expr(&init.expr, terms)?;
                quote! {
                    let #name = #res;
                }
            };
            terms.push(ts);
            Ok(())
        }
        Stmt::Expr(ex, _) => traverse_expr(ex, terms).map(|_| ()),
        other => Err(syn::Error::new(other.span(), "unsupported statement")),
    }
}

fn var_name(terms: &[TokenStream2]) -> String {
    format!("_a{}", terms.len())
}

/// A numeric literal, possibly negated, as an `f64` expression.
fn literal(input: &Expr) -> Option<TokenStream2> {
    match input {
        Expr::Lit(lit) => Some(quote! { ((#lit) as f64) }),
        Expr::Paren(ex) => literal(&ex.expr),
        Expr::Unary(un) if matches!(un.op, UnOp::Neg(_)) => {
            literal(&un.expr).map(|inner| quote! { (-#inner) })
        }
        _ => None,
    }
}

fn traverse_expr(input: &Expr, terms: &mut Vec<TokenStream2>) -> syn::Result<Ident> {
    if let Some(value) = literal(input) {
        let name = Ident::new(&var_name(terms), input.span());
        terms.push(quote! {
            let #name = __hypograd_graph.leaf(#value);
        });
        return Ok(name);
    }
    match input {
        Expr::Binary(ex) => {
            let lhs = traverse_expr(&ex.left, terms)?;
            let rhs = traverse_expr(&ex.right, terms)?;
            let name = Ident::new(&var_name(terms), ex.span());
            let binop = match &ex.op {
                BinOp::Add(_) => quote! { #lhs + #rhs },
                BinOp::Mul(_) => quote! { #lhs * #rhs },
                op => {
                    let symbol = quote! { #op };
                    return Err(syn::Error::new(
                        op.span(),
                        format!("unsupported operation `{symbol}`: only `+` and `*` are differentiable"),
                    ));
                }
            };
            terms.push(quote! {
                let #name = #binop;
            });
            Ok(name)
        }
        Expr::Paren(ex) => traverse_expr(&ex.expr, terms),
        Expr::Group(ex) => traverse_expr(&ex.expr, terms),
        Expr::Path(path) => path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.clone())
            .ok_or_else(|| syn::Error::new(path.span(), "empty path")),
        Expr::Call(call) => Err(syn::Error::new(
            call.func.span(),
            "unsupported operation: function calls are not differentiable",
        )),
        Expr::Unary(un) => Err(syn::Error::new(
            un.span(),
            "unsupported operation: only literals may be negated",
        )),
        other => Err(syn::Error::new(other.span(), "unsupported expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_error(stmt: Stmt) -> String {
        let mut terms = vec![];
        traverse_stmt(&stmt, &mut terms).unwrap_err().to_string()
    }

    #[test]
    fn test_supported_ops() {
        let mut terms = vec![];
        traverse_stmt(&parse_quote! { let f = (x + y + 2.) * (y * y); }, &mut terms).unwrap();
        // x + y, 2., sum, y * y, product, binding
        assert_eq!(terms.len(), 6);
    }

    #[test]
    fn test_rejects_sub() {
        assert_eq!(
            expand_error(parse_quote! { let f = x - y; }),
            "unsupported operation `-`: only `+` and `*` are differentiable"
        );
    }

    #[test]
    fn test_rejects_div() {
        assert_eq!(
            expand_error(parse_quote! { let f = x * (x / y); }),
            "unsupported operation `/`: only `+` and `*` are differentiable"
        );
    }

    #[test]
    fn test_rejects_call() {
        assert_eq!(
            expand_error(parse_quote! { let f = sin(x) + y; }),
            "unsupported operation: function calls are not differentiable"
        );
    }

    #[test]
    fn test_rejects_negated_node() {
        assert_eq!(
            expand_error(parse_quote! { let f = -x; }),
            "unsupported operation: only literals may be negated"
        );
    }

    #[test]
    fn test_no_partial_expansion() {
        let mut terms = vec![];
        assert!(traverse_stmt(&parse_quote! { let f = x + y - 1.; }, &mut terms).is_err());
        // The failing binding itself is never emitted.
        assert!(terms.iter().all(|t| !t.to_string().contains("let f")));
    }
}
