//! Core pipeline traits.
//!
//! - [`Node`] - transforms inputs into zero or more outputs
//! - [`Sink`] - terminal receiver of pushed data
//!
//! Pipelines are owned by the thread that drives them (a device callback),
//! so both traits take `&mut self` and need no interior locking.

/// A processing unit that transforms input data to output data.
pub trait Node: Send {
    type Input;
    type Output;

    /// Process one input, handing every ready output to `emit` in order.
    ///
    /// Buffering nodes may emit nothing for a given input, or several
    /// outputs once enough data has accumulated.
    fn process(&mut self, input: Self::Input, emit: &mut dyn FnMut(Self::Output));
}

/// Receives pushed data.
pub trait Sink: Send {
    type Input;

    fn push(&mut self, input: Self::Input);

    /// Put `node` in front of this sink, yielding a sink for the node's input.
    ///
    /// Chains read right-to-left, the way data is pulled toward the sink:
    ///
    /// ```ignore
    /// let sink = network.get_data_from(encoder).get_data_from(batcher);
    /// sink.push(block); // batcher -> encoder -> network
    /// ```
    fn get_data_from<N>(self, node: N) -> Chained<N, Self>
    where
        N: Node<Output = Self::Input>,
        Self: Sized,
    {
        Chained { node, sink: self }
    }
}

/// A [`Node`] feeding a [`Sink`]; itself a sink for the node's input.
pub struct Chained<N, S> {
    node: N,
    sink: S,
}

impl<N, S> Sink for Chained<N, S>
where
    N: Node,
    S: Sink<Input = N::Output>,
{
    type Input = N::Input;

    fn push(&mut self, input: Self::Input) {
        let Self { node, sink } = self;
        node.process(input, &mut |output| sink.push(output));
    }
}

impl<T> Sink for Box<dyn Sink<Input = T>> {
    type Input = T;

    fn push(&mut self, input: T) {
        (**self).push(input)
    }
}
