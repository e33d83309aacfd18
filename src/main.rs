use hypograd::{Graph, Result};
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    let graph = Graph::new();
    let x = graph.var(2.);
    let y = graph.var(7.);
    let c = graph.leaf(2.);

    // f(x, y) = (x + y + 2) * (y * y)
    let f = (x + y + c) * (y * y);
    println!("before backprop");
    println!("{f}");

    let grads = f.backward()?;

    // df/dx = y^2, df/dy = 2xy + 3y^2 + 4y
    let grad_x = grads.wrt(&x)?;
    let grad_y = grads.wrt(&y)?;
    println!("grad_x {}", grad_x.value());
    println!("grad_y {}", grad_y.value());

    let grads_grad_x = grad_x.backward()?;
    println!("grad_xx {}", grads_grad_x.wrt(&x)?.value());
    println!("grad_yx {}", grads_grad_x.wrt(&y)?.value());

    let grads_grad_y = grad_y.backward()?;
    println!("grad_yy {}", grads_grad_y.wrt(&y)?.value());
    println!("grad_xy {}", grads_grad_y.wrt(&x)?.value());

    info!("graph holds {} nodes", graph.len());
    Ok(())
}
